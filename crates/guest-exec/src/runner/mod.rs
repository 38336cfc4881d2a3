//! The command runner seam.
//!
//! Every interaction with the engine and the host funnels through a
//! [`CommandRunner`]. The production implementation is
//! [`SudoCommandRunner`](crate::process::SudoCommandRunner); controllers hold
//! the runner behind an `Arc<dyn CommandRunner>` so tests can substitute a
//! double that records commands and replays scripted results.

use std::sync::Arc;

use crate::command::{CommandOutput, CommandSpec};
use crate::error::CommandError;

/// Runs administrative commands as a designated principal.
///
/// # Example
///
/// ```
/// use guest_exec::{CommandError, CommandOutput, CommandRunner, CommandSpec};
///
/// struct Echo;
///
/// impl CommandRunner for Echo {
///     fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
///         Ok(CommandOutput::stdout(spec.command()))
///     }
/// }
/// ```
pub trait CommandRunner: Send + Sync {
    /// Runs the command described by `spec` and captures its output.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] if the command cannot be spawned, exceeds
    /// its timeout, or exits with a non-zero status.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

impl<T> CommandRunner for Arc<T>
where
    T: CommandRunner + ?Sized,
{
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        (**self).run(spec)
    }
}

impl<T> CommandRunner for &T
where
    T: CommandRunner + ?Sized,
{
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        (**self).run(spec)
    }
}
