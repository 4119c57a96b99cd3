//! Thread hold table.
//!
//! Maps a server thread name to the matcher that is consuming its
//! continuation lines. At most one matcher holds a thread at a time.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hold {
    matcher: usize,
    lines: usize,
}

/// Outcome of recording one continuation line against a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldBudget {
    Within,
    Exhausted,
}

/// Holds keyed by thread name. Matchers are referenced by their index in the
/// dispatcher's ordered matcher list.
///
/// A matcher whose continuation predicate never releases would keep its
/// thread forever, so each hold is bounded to `max_lines` continuation lines.
#[derive(Debug)]
pub struct HoldTable {
    holds: HashMap<String, Hold>,
    max_lines: usize,
}

impl HoldTable {
    pub fn new(max_lines: usize) -> Self {
        Self {
            holds: HashMap::new(),
            max_lines,
        }
    }

    /// Matcher index holding `thread`, if any.
    pub fn holder(&self, thread: &str) -> Option<usize> {
        self.holds.get(thread).map(|h| h.matcher)
    }

    /// Registers a new hold. Replaces any previous holder of the thread.
    pub fn hold(&mut self, thread: &str, matcher: usize) {
        self.holds.insert(thread.to_string(), Hold { matcher, lines: 0 });
    }

    /// Counts one continuation line for the hold on `thread`.
    pub fn record_line(&mut self, thread: &str) -> HoldBudget {
        match self.holds.get_mut(thread) {
            Some(hold) => {
                hold.lines += 1;
                if self.max_lines > 0 && hold.lines >= self.max_lines {
                    HoldBudget::Exhausted
                } else {
                    HoldBudget::Within
                }
            }
            None => HoldBudget::Within,
        }
    }

    pub fn release(&mut self, thread: &str) -> Option<usize> {
        self.holds.remove(thread).map(|h| h.matcher)
    }

    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.holds.len()
    }

    /// Threads still held, with the matcher index holding each.
    pub fn held_threads(&self) -> Vec<(String, usize)> {
        let mut held: Vec<(String, usize)> = self
            .holds
            .iter()
            .map(|(thread, hold)| (thread.clone(), hold.matcher))
            .collect();
        held.sort();
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_and_release() {
        let mut table = HoldTable::new(0);
        assert!(table.is_empty());

        table.hold("Main", 0);
        assert_eq!(table.holder("Main"), Some(0));
        assert_eq!(table.holder("Server"), None);

        assert_eq!(table.release("Main"), Some(0));
        assert_eq!(table.release("Main"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_one_holder_per_thread() {
        let mut table = HoldTable::new(0);
        table.hold("Main", 0);
        table.hold("Main", 2);
        table.hold("Emerge", 1);

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.held_threads(),
            vec![("Emerge".to_string(), 1), ("Main".to_string(), 2)]
        );
    }

    #[test]
    fn test_budget() {
        let mut table = HoldTable::new(3);
        table.hold("Main", 0);
        assert_eq!(table.record_line("Main"), HoldBudget::Within);
        assert_eq!(table.record_line("Main"), HoldBudget::Within);
        assert_eq!(table.record_line("Main"), HoldBudget::Exhausted);

        // Unbounded when zero.
        let mut unbounded = HoldTable::new(0);
        unbounded.hold("Main", 0);
        for _ in 0..10_000 {
            assert_eq!(unbounded.record_line("Main"), HoldBudget::Within);
        }
    }
}
