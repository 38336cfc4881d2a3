//! Guest agent for a DB2 engine instance running inside a managed guest.
//!
//! The agent owns three concerns. The override controller captures the
//! engine's factory configuration once (see [`DefaultSnapshot`]) and applies
//! or reverts user override layers one parameter at a time. The lifecycle
//! controller starts, stops, and restarts the engine and waits on a status
//! probe for each transition. The admin surface creates, deletes, and lists
//! databases and users, paginating listings with name markers.
//!
//! Every engine and host interaction goes through the
//! [`guest_exec::CommandRunner`] seam. [`bootstrap_with`] wires the pieces
//! from a loaded [`guest_config::Config`] and reports each stage through a
//! [`HealthReporter`].
//!
//! Operations assume a single caller per engine instance; nothing here takes
//! locks around lifecycle or configuration changes.

mod admin;
mod app;
mod bootstrap;
mod commands;
mod fs;
mod health;
mod lifecycle;
mod models;
mod overrides;
mod pagination;
mod snapshot;
mod status;
mod store;
pub mod telemetry;

pub use admin::{AdminError, BatchReport, Db2Admin};
pub use app::Db2App;
pub use bootstrap::{Agent, BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
pub use commands::{ALREADY_STARTED_CODE, ALREADY_STOPPED_CODE, Db2Commands};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::{LifecycleError, ServiceController};
pub use models::{
    DatabaseSchema, DatabaseUser, Db2SchemaPolicy, MAX_DATABASE_NAME_LEN, MAX_USER_NAME_LEN,
    SchemaPolicy, ValidationError,
};
pub use overrides::{OverrideController, OverrideError};
pub use pagination::{Page, paginate};
pub use snapshot::{AUTOMATIC, DefaultSnapshot, NULL_VALUE, SnapshotError};
pub use status::{
    Db2StatusProbe, EngineStatus, LifecycleState, StatusProbe, StatusSnapshot, StatusTracker,
    WaitError,
};
pub use store::{
    ConfigurationStore, FileConfigurationStore, OverrideLayer, StoreError, USER_OVERRIDE_FILE,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
