//! Scripted [`CommandRunner`] double for unit and behaviour tests.
//!
//! The runner records every command it receives and answers with the outcome
//! of the most recently registered rule whose needle occurs in the command
//! text. Commands that match no rule succeed with empty output.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::command::{CommandOutput, CommandSpec};
use crate::error::CommandError;
use crate::runner::CommandRunner;

/// A command observed by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Raw command text.
    pub command: String,
    /// Principal the command ran as.
    pub principal: String,
}

#[derive(Debug)]
struct Rule {
    needle: String,
    outcome: Result<CommandOutput, (i32, String)>,
}

/// Runner double that replays scripted outcomes.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    invocations: Mutex<Vec<Invocation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedRunner {
    /// Builds a runner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands containing `needle` with `outcome`.
    ///
    /// An `Err` outcome is reported as a non-zero exit with the given status.
    pub fn respond(&self, needle: &str, outcome: Result<CommandOutput, i32>) {
        let outcome = outcome.map_err(|status| (status, String::from("scripted failure")));
        lock(&self.rules).push(Rule {
            needle: needle.to_owned(),
            outcome,
        });
    }

    /// Makes commands containing `needle` exit with `status`.
    pub fn fail(&self, needle: &str, status: i32) {
        self.respond(needle, Err(status));
    }

    /// Makes commands containing `needle` exit with `status`, printing
    /// `stderr`.
    pub fn fail_with(&self, needle: &str, status: i32, stderr: &str) {
        lock(&self.rules).push(Rule {
            needle: needle.to_owned(),
            outcome: Err((status, stderr.to_owned())),
        });
    }

    /// Makes commands containing `needle` print `stdout`.
    pub fn succeed_with(&self, needle: &str, stdout: &str) {
        self.respond(needle, Ok(CommandOutput::stdout(stdout)));
    }

    /// Every command received so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    /// Raw text of every command received so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|invocation| invocation.command)
            .collect()
    }

    /// Commands containing `needle`, in order.
    #[must_use]
    pub fn commands_containing(&self, needle: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|command| command.contains(needle))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        lock(&self.invocations).push(Invocation {
            command: spec.command().to_owned(),
            principal: spec.principal().to_owned(),
        });

        let rules = lock(&self.rules);
        let outcome = rules
            .iter()
            .rev()
            .find(|rule| spec.command().contains(rule.needle.as_str()))
            .map(|rule| rule.outcome.clone());

        match outcome {
            None => Ok(CommandOutput::default()),
            Some(Ok(output)) => Ok(output),
            Some(Err((status, stderr))) => Err(CommandError::NonZeroExit {
                command: spec.display_command().to_owned(),
                status,
                stderr,
            }),
        }
    }
}
