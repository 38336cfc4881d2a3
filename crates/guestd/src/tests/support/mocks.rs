//! `mockall` doubles for the probe and store seams.

use std::sync::atomic::{AtomicUsize, Ordering};

use mockall::mock;

use crate::status::{EngineStatus, StatusProbe};
use crate::store::{ConfigurationStore, OverrideLayer, StoreError};

mock! {
    pub Probe {}
    impl StatusProbe for Probe {
        fn probe(&self) -> EngineStatus;
    }
}

mock! {
    pub Store {}
    impl ConfigurationStore for Store {
        fn save(&self, raw: &str) -> Result<(), StoreError>;
        fn active_override(&self) -> Result<OverrideLayer, StoreError>;
        fn apply_override(&self, layer: &OverrideLayer) -> Result<(), StoreError>;
        fn remove_override(&self) -> Result<(), StoreError>;
    }
}

/// Probe replaying `statuses` in order, repeating the last one forever.
pub fn probe_reporting(statuses: &[EngineStatus]) -> MockProbe {
    let statuses = statuses.to_vec();
    let calls = AtomicUsize::new(0);
    let mut probe = MockProbe::new();
    probe.expect_probe().returning(move || {
        let index = calls.fetch_add(1, Ordering::SeqCst);
        statuses
            .get(index)
            .or_else(|| statuses.last())
            .copied()
            .unwrap_or(EngineStatus::Shutdown)
    });
    probe
}
