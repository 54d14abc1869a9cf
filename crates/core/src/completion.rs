use std::collections::BTreeSet;

use crate::command::Command;

/// Decides whether a command signals that the task is complete.
///
/// Matching is by exact tool name. An empty detector never fires, so the
/// loop then ends only by budget, silence, failure or an external stop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionDetector {
    terminal_commands: BTreeSet<String>,
}

impl CompletionDetector {
    /// Creates a detector for the given terminal command names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terminal_commands: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a terminal command name.
    #[inline]
    pub fn insert<S: Into<String>>(&mut self, name: S) {
        self.terminal_commands.insert(name.into());
    }

    /// Returns `true` if executing `command` should finish the run.
    #[inline]
    pub fn is_terminal(&self, command: &Command) -> bool {
        self.terminal_commands.contains(command.name())
    }

    /// Returns the configured terminal command names.
    #[inline]
    pub fn terminal_commands(&self) -> impl Iterator<Item = &str> {
        self.terminal_commands.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_exact_match() {
        let detector = CompletionDetector::new(["finish", "attempt_completion"]);
        let finish = Command::new("1", "finish", json!({}));
        let shell = Command::new("2", "shell", json!({}));
        let similar = Command::new("3", "Finish", json!({}));

        assert!(detector.is_terminal(&finish));
        assert!(!detector.is_terminal(&shell));
        assert!(!detector.is_terminal(&similar));
    }

    #[test]
    fn test_empty_never_fires() {
        let detector = CompletionDetector::default();
        assert!(!detector.is_terminal(&Command::new("1", "finish", json!({}))));
        assert_eq!(detector.terminal_commands().count(), 0);
    }
}
