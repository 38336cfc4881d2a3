//! Command descriptions and captured output.

use std::fmt;
use std::time::Duration;

/// Placeholder shown instead of commands that embed secrets.
const REDACTED: &str = "<redacted>";

/// A shell command to run as a given principal within a time budget.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    command: String,
    principal: String,
    timeout: Duration,
    sensitive: bool,
}

impl CommandSpec {
    /// Describes `command`, run through a login shell of `principal`.
    #[must_use]
    pub fn new(command: impl Into<String>, principal: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            principal: principal.into(),
            timeout,
            sensitive: false,
        }
    }

    /// Marks the command text as secret so logs and errors never show it.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Raw command text handed to the shell.
    #[must_use]
    pub fn command(&self) -> &str {
        self.command.as_str()
    }

    /// OS account the command runs as.
    #[must_use]
    pub fn principal(&self) -> &str {
        self.principal.as_str()
    }

    /// Maximum time the command may run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` when the command text must not be logged.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Command text safe for logs and error messages.
    #[must_use]
    pub fn display_command(&self) -> &str {
        if self.sensitive {
            REDACTED
        } else {
            self.command.as_str()
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandSpec")
            .field("command", &self.display_command())
            .field("principal", &self.principal)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Output captured from a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Builds output from captured streams.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Output carrying only standard output.
    #[must_use]
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self::new(stdout, String::new())
    }

    /// Non-empty standard output lines, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().filter(|line| !line.trim().is_empty())
    }

    /// Whitespace-separated standard output tokens, in order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.stdout.split_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn sensitive_commands_are_redacted() {
        let spec = CommandSpec::new("echo alice:secret | chpasswd", "root", Duration::from_secs(5))
            .sensitive();
        assert_eq!(spec.display_command(), REDACTED);
        assert_eq!(spec.command(), "echo alice:secret | chpasswd");
        assert!(!format!("{spec:?}").contains("secret"));
    }

    #[rstest]
    fn lines_skip_blank_entries() {
        let output = CommandOutput::stdout("ALICE Y\n\n  \nBOB N\n");
        assert_eq!(output.lines().collect::<Vec<_>>(), vec!["ALICE Y", "BOB N"]);
    }

    #[rstest]
    fn tokens_split_on_any_whitespace() {
        let output = CommandOutput::stdout("SALES\nHR   \n\tFIN\n");
        assert_eq!(output.tokens().collect::<Vec<_>>(), vec!["SALES", "HR", "FIN"]);
    }
}
