//! Durable configuration state: the raw base configuration plus at most one
//! active user override layer.
//!
//! Applying a layer replaces the previous one wholesale; layers are never
//! merged at the storage level. Reverts resolve against the default snapshot,
//! not against earlier layers.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use guest_config::Config;
use thiserror::Error;
use tracing::debug;

use crate::fs::atomic_write;

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// File name of the active user override layer inside the overrides directory.
pub const USER_OVERRIDE_FILE: &str = "user.json";

/// Parameter name to desired value, iterated in name order.
pub type OverrideLayer = BTreeMap<String, String>;

/// Errors raised by a [`ConfigurationStore`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Reading or writing a store file failed.
    #[error("configuration store I/O failed for '{path}': {source}")]
    Io {
        /// File that could not be accessed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// A stored override layer could not be encoded or decoded.
    #[error("override layer '{path}' is not valid JSON: {source}")]
    Json {
        /// Layer file.
        path: Utf8PathBuf,
        /// Underlying serde error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// Durable persistence of raw configuration text and the override layer.
pub trait ConfigurationStore: Send + Sync {
    /// Stores `raw` as the base configuration text.
    fn save(&self, raw: &str) -> Result<(), StoreError>;

    /// Returns the active override layer, empty when none is recorded.
    fn active_override(&self) -> Result<OverrideLayer, StoreError>;

    /// Records `layer` as the active override layer, replacing any prior one.
    fn apply_override(&self, layer: &OverrideLayer) -> Result<(), StoreError>;

    /// Deletes the active override layer record. Absent layers are ignored.
    fn remove_override(&self) -> Result<(), StoreError>;
}

impl<T> ConfigurationStore for Arc<T>
where
    T: ConfigurationStore + ?Sized,
{
    fn save(&self, raw: &str) -> Result<(), StoreError> {
        (**self).save(raw)
    }

    fn active_override(&self) -> Result<OverrideLayer, StoreError> {
        (**self).active_override()
    }

    fn apply_override(&self, layer: &OverrideLayer) -> Result<(), StoreError> {
        (**self).apply_override(layer)
    }

    fn remove_override(&self) -> Result<(), StoreError> {
        (**self).remove_override()
    }
}

/// Store keeping its files under the data volume mount point.
#[derive(Debug, Clone)]
pub struct FileConfigurationStore {
    base_path: Utf8PathBuf,
    override_path: Utf8PathBuf,
}

impl FileConfigurationStore {
    /// Builds a store rooted at the configured mount point.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.base_configuration_path(),
            config.overrides_dir().join(USER_OVERRIDE_FILE),
        )
    }

    /// Builds a store using explicit file locations.
    #[must_use]
    pub fn new(base_path: impl Into<Utf8PathBuf>, override_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            override_path: override_path.into(),
        }
    }

    /// Location of the base configuration text.
    #[must_use]
    pub fn base_path(&self) -> &Utf8Path {
        &self.base_path
    }

    /// Location of the active override layer.
    #[must_use]
    pub fn override_path(&self) -> &Utf8Path {
        &self.override_path
    }
}

impl ConfigurationStore for FileConfigurationStore {
    fn save(&self, raw: &str) -> Result<(), StoreError> {
        atomic_write(&self.base_path, raw.as_bytes())
            .map_err(|source| io_error(&self.base_path, source))?;
        debug!(
            target: STORE_TARGET,
            path = %self.base_path,
            bytes = raw.len(),
            "base configuration saved"
        );
        Ok(())
    }

    fn active_override(&self) -> Result<OverrideLayer, StoreError> {
        let raw = match fs::read_to_string(&self.override_path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(OverrideLayer::new());
            }
            Err(error) => return Err(io_error(&self.override_path, error)),
        };
        serde_json::from_str(&raw).map_err(|source| json_error(&self.override_path, source))
    }

    fn apply_override(&self, layer: &OverrideLayer) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(layer)
            .map_err(|source| json_error(&self.override_path, source))?;
        atomic_write(&self.override_path, &encoded)
            .map_err(|source| io_error(&self.override_path, source))?;
        debug!(
            target: STORE_TARGET,
            path = %self.override_path,
            parameters = layer.len(),
            "override layer recorded"
        );
        Ok(())
    }

    fn remove_override(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.override_path) {
            Ok(()) => {
                debug!(
                    target: STORE_TARGET,
                    path = %self.override_path,
                    "override layer removed"
                );
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&self.override_path, error)),
        }
    }
}

fn io_error(path: &Utf8Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}

fn json_error(path: &Utf8Path, source: serde_json::Error) -> StoreError {
    StoreError::Json {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}
