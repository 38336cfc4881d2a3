//! Test harness utilities shared by unit and behavioural suites.

mod config_loader;
mod mocks;
mod reporter;
pub mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use mocks::{MockProbe, MockStore, probe_reporting};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
