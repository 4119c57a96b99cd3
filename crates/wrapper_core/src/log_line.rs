//! Classification of raw server output lines.
//!
//! The server prints `TIMESTAMP: LEVEL[THREAD]: MESSAGE`. Anything else
//! (stack traces, banners, wrapped output) is unclassified and never reaches
//! the matchers.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref SERVER_LOG_PATTERN: Regex = Regex::new(
        r"^(?P<ts>[0-9: -]+): (?P<output>(?P<level>[A-Z]+)\[(?P<thread>[a-zA-Z]+)\]: (?P<msg>.*))$"
    )
    .expect("server log pattern is valid");
}

/// Severity reported by the server for one line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Error,
    Warning,
    Action,
    Info,
    Verbose,
    Other(String),
}

impl LogLevel {
    fn parse(raw: &str) -> Self {
        match raw {
            "ERROR" => LogLevel::Error,
            "WARNING" => LogLevel::Warning,
            "ACTION" => LogLevel::Action,
            "INFO" => LogLevel::Info,
            "VERBOSE" => LogLevel::Verbose,
            other => LogLevel::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Action => "ACTION",
            LogLevel::Info => "INFO",
            LogLevel::Verbose => "VERBOSE",
            LogLevel::Other(s) => s,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified line of server output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: String,
    pub level: LogLevel,
    pub thread: String,
    pub message: String,
    /// The `LEVEL[THREAD]: MESSAGE` part, used when re-logging the line.
    pub output: String,
}

impl LogLine {
    /// Classifies a raw line. Returns `None` when the line is not in the
    /// server's log format.
    pub fn classify(raw: &str) -> Option<Self> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let caps = SERVER_LOG_PATTERN.captures(line)?;

        Some(Self {
            timestamp: caps["ts"].to_string(),
            level: LogLevel::parse(&caps["level"]),
            thread: caps["thread"].to_string(),
            message: caps["msg"].to_string(),
            output: caps["output"].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_action_line() {
        let line = LogLine::classify("2024-03-02 10:15:01: ACTION[Server]: alice joins game. List of players: alice")
            .expect("line should classify");

        assert_eq!(line.timestamp, "2024-03-02 10:15:01");
        assert_eq!(line.level, LogLevel::Action);
        assert_eq!(line.thread, "Server");
        assert_eq!(line.message, "alice joins game. List of players: alice");
        assert_eq!(line.output, "ACTION[Server]: alice joins game. List of players: alice");
    }

    #[test]
    fn test_classify_strips_line_endings() {
        let line = LogLine::classify("2024-03-02 10:15:01: ERROR[Main]: boom\r\n").expect("line should classify");
        assert_eq!(line.level, LogLevel::Error);
        assert_eq!(line.message, "boom");
    }

    #[test]
    fn test_unknown_level_is_kept() {
        let line = LogLine::classify("10:15:01: TRACE[Emerge]: tick").expect("line should classify");
        assert_eq!(line.level, LogLevel::Other("TRACE".to_string()));
        assert_eq!(line.level.to_string(), "TRACE");
    }

    #[test]
    fn test_unclassified_lines() {
        let rejects = [
            "",
            "  Separate stack trace line",
            "2024-03-02 10:15:01: ACTION: missing thread",
            "2024-03-02 10:15:01: action[Server]: lowercase level",
            "2024-03-02 10:15:01: ACTION[Server1]: digits in thread",
            "ACTION[Server]: no timestamp",
            "Minetest 5.4.1 (Linux)",
        ];
        for raw in rejects {
            assert!(LogLine::classify(raw).is_none(), "{raw:?} should not classify");
        }
    }
}
