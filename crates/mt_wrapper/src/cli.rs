//! Command-line interface for the wrapper.
//!
//! Anything after the recognised options (or after `--`) is passed through
//! to the server unchanged.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Options given here override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Server binary override
    pub server_binary: Option<PathBuf>,
    /// World directory
    pub world: Option<PathBuf>,
    /// Configuration file; defaults to `minepass.toml` inside the world
    pub config_path: Option<PathBuf>,
    pub ignore_missing_world: bool,
    pub log_level: Option<String>,
    pub json_logs: bool,
    /// Extra arguments for the server
    pub server_args: Vec<String>,
}

fn command() -> Command {
    Command::new("MinePass Minetest Wrapper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a Minetest server under MinePass authorization")
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .value_name("BIN")
                .help("Minetest binary to launch"),
        )
        .arg(
            Arg::new("world")
                .short('w')
                .long("world")
                .value_name("DIR")
                .help("World directory"),
        )
        .arg(
            Arg::new("ignore-missing-world")
                .long("ignore-missing-world")
                .help("Start even if world.mt does not exist yet")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (default: <world>/minepass.toml)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("server-args")
                .value_name("SERVER_ARGS")
                .help("Arguments passed through to the server")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            server_binary: matches.get_one::<String>("server").map(PathBuf::from),
            world: matches.get_one::<String>("world").map(PathBuf::from),
            config_path: matches.get_one::<String>("config").map(PathBuf::from),
            ignore_missing_world: matches.get_flag("ignore-missing-world"),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            server_args: matches
                .get_many::<String>("server-args")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Configuration file to load: explicit `--config`, else
    /// `minepass.toml` in the world directory.
    pub fn resolved_config_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(|| self.world.as_ref().map(|w| w.join("minepass.toml")))
    }
}
