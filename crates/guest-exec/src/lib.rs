//! Administrative command execution for the DB2 guest agent.
//!
//! All interaction with the database engine and the host operating system
//! funnels through the [`CommandRunner`] trait: a command string is run as a
//! designated OS principal within a timeout, yielding captured output or a
//! [`CommandError`]. Controllers never spawn processes themselves, which keeps
//! the engine-facing logic testable against a scripted double.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use guest_exec::{CommandRunner, CommandSpec, SudoCommandRunner};
//!
//! let runner: Arc<dyn CommandRunner> = Arc::new(SudoCommandRunner::new());
//! let spec = CommandSpec::new("db2start", "db2inst1", Duration::from_secs(1200));
//! match runner.run(&spec) {
//!     Ok(output) => println!("{}", output.stdout),
//!     Err(error) => eprintln!("{error}"),
//! }
//! ```

pub mod command;
pub mod error;
pub mod process;
pub mod runner;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use self::command::{CommandOutput, CommandSpec};
pub use self::error::CommandError;
pub use self::process::SudoCommandRunner;
pub use self::runner::CommandRunner;
