//! Button-map storage boundary
//!
//! Persistence of feature bindings is owned by an external collaborator;
//! this module only defines the seam. Bindings are keyed by device identity
//! plus controller profile identity. [`MemoryButtonMapStore`] is a
//! process-local implementation for hosts without persistent storage and
//! for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::feature::{Feature, FeatureName};

/// Canonical feature store of one button map.
///
/// Ordered so that persisted maps and log output are deterministic.
pub type FeatureMap = BTreeMap<FeatureName, Feature>;

/// External storage for controller feature bindings.
pub trait ButtonMapStore: Send + Sync {
    /// Load the bindings for `device_id` + `controller_id`.
    ///
    /// Returns `None` when storage is unavailable or holds no map for this
    /// pairing.
    fn load(&self, device_id: &str, controller_id: &str) -> Option<FeatureMap>;

    /// Persist the bindings for `device_id` + `controller_id`.
    ///
    /// Returns false when the store cannot persist (the in-memory map stays
    /// authoritative for the session either way).
    fn save(&self, device_id: &str, controller_id: &str, features: &FeatureMap) -> bool;
}

/// In-memory button-map store.
#[derive(Default)]
pub struct MemoryButtonMapStore {
    maps: Mutex<HashMap<(String, String), FeatureMap>>,
}

impl MemoryButtonMapStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed the store with a feature map, replacing any existing entry.
    pub fn insert(&self, device_id: &str, controller_id: &str, features: FeatureMap) {
        self.maps
            .lock()
            .insert((device_id.to_string(), controller_id.to_string()), features);
    }
}

impl ButtonMapStore for MemoryButtonMapStore {
    fn load(&self, device_id: &str, controller_id: &str) -> Option<FeatureMap> {
        self.maps
            .lock()
            .get(&(device_id.to_string(), controller_id.to_string()))
            .cloned()
    }

    fn save(&self, device_id: &str, controller_id: &str, features: &FeatureMap) -> bool {
        self.maps.lock().insert(
            (device_id.to_string(), controller_id.to_string()),
            features.clone(),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::DriverPrimitive;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryButtonMapStore::new();

        let mut features = FeatureMap::new();
        features.insert("a".to_string(), Feature::Scalar(DriverPrimitive::button(0)));

        assert!(store.save("gamepad", "game.controller.default", &features));
        let loaded = store.load("gamepad", "game.controller.default").unwrap();
        assert_eq!(loaded, features);
    }

    #[test]
    fn test_memory_store_misses_unknown_pairing() {
        let store = MemoryButtonMapStore::new();
        assert!(store.load("gamepad", "game.controller.default").is_none());
    }
}
