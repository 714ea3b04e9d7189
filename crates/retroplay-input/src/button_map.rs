//! Button map
//!
//! Per-device, per-controller-profile mapping between driver primitives and
//! logical features. The canonical store maps feature name to feature; a
//! derived reverse index maps each bound primitive back to its feature name
//! for O(1) event lookup. The reverse index is rebuilt on `load()` and
//! maintained incrementally by the `add_*` operations.
//!
//! Invariants:
//! - the reverse index is always consistent with the canonical store;
//! - a primitive resolves to at most one feature (last write wins);
//! - accelerometer primitives resolve on either axis polarity.

use std::collections::HashMap;
use std::sync::Arc;

use crate::feature::{Accelerometer, AnalogStick, Feature, FeatureKind, FeatureName};
use crate::primitive::DriverPrimitive;
use crate::storage::{ButtonMapStore, FeatureMap};

/// Bidirectional primitive/feature map for one device + controller profile.
pub struct ButtonMap {
    device_id: String,
    controller_id: String,
    store: Arc<dyn ButtonMapStore>,
    writable: bool,
    features: FeatureMap,
    driver_map: HashMap<DriverPrimitive, FeatureName>,
}

impl ButtonMap {
    /// Create a writable button map backed by `store`.
    pub fn new(store: Arc<dyn ButtonMapStore>, device_id: &str, controller_id: &str) -> Self {
        Self::with_writable(store, device_id, controller_id, true)
    }

    /// Create a read-only button map.
    ///
    /// Lookups work as usual; `add_*` and [`reset`](Self::reset) refuse and
    /// nothing is ever persisted.
    pub fn read_only(store: Arc<dyn ButtonMapStore>, device_id: &str, controller_id: &str) -> Self {
        Self::with_writable(store, device_id, controller_id, false)
    }

    fn with_writable(
        store: Arc<dyn ButtonMapStore>,
        device_id: &str,
        controller_id: &str,
        writable: bool,
    ) -> Self {
        ButtonMap {
            device_id: device_id.to_string(),
            controller_id: controller_id.to_string(),
            store,
            writable,
            features: FeatureMap::new(),
            driver_map: HashMap::new(),
        }
    }

    /// Controller profile this map belongs to.
    #[must_use]
    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    /// Device this map belongs to.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Load the bindings from storage and rebuild the reverse index.
    ///
    /// On failure the previous in-memory state is kept and false is
    /// returned.
    pub fn load(&mut self) -> bool {
        match self.store.load(&self.device_id, &self.controller_id) {
            Some(features) => {
                log::debug!(
                    "Loaded button map with {} features for controller {}",
                    features.len(),
                    self.controller_id
                );
                self.features = features;
                self.driver_map = Self::build_lookup_table(&self.features);
                true
            }
            None => {
                log::debug!(
                    "Failed to load button map for controller {}",
                    self.controller_id
                );
                false
            }
        }
    }

    /// Build the reverse index for a feature map.
    ///
    /// Accelerometer entries are inserted twice per bound axis, once as
    /// stored and once direction-negated, so input on either polarity
    /// resolves to the feature.
    fn build_lookup_table(features: &FeatureMap) -> HashMap<DriverPrimitive, FeatureName> {
        let mut driver_map = HashMap::new();

        for (name, feature) in features {
            for primitive in feature.primitives() {
                driver_map.insert(primitive, name.clone());
                if feature.kind() == FeatureKind::Accelerometer {
                    if let Some(opposite) = primitive.opposite() {
                        driver_map.insert(opposite, name.clone());
                    }
                }
            }
        }

        driver_map
    }

    /// Resolve a primitive to the feature it is bound to.
    #[must_use]
    pub fn feature_for(&self, primitive: DriverPrimitive) -> Option<&FeatureName> {
        self.driver_map.get(&primitive)
    }

    /// Kind of a stored feature.
    #[must_use]
    pub fn feature_kind(&self, feature: &str) -> Option<FeatureKind> {
        self.features.get(feature).map(Feature::kind)
    }

    /// Primitive of a scalar feature.
    ///
    /// Fails (returns `None`) when the feature is missing or stored with a
    /// different kind.
    #[must_use]
    pub fn scalar(&self, feature: &str) -> Option<DriverPrimitive> {
        match self.features.get(feature) {
            Some(Feature::Scalar(primitive)) => Some(*primitive),
            _ => None,
        }
    }

    /// Directional primitives of an analog-stick feature.
    #[must_use]
    pub fn analog_stick(&self, feature: &str) -> Option<AnalogStick> {
        match self.features.get(feature) {
            Some(Feature::AnalogStick(stick)) => Some(*stick),
            _ => None,
        }
    }

    /// Positive-axis primitives of an accelerometer feature.
    #[must_use]
    pub fn accelerometer(&self, feature: &str) -> Option<Accelerometer> {
        match self.features.get(feature) {
            Some(Feature::Accelerometer(accel)) => Some(*accel),
            _ => None,
        }
    }

    /// Bind a primitive to a scalar feature.
    ///
    /// Any feature currently holding the primitive loses it first, so the
    /// reverse index never carries stale entries. Returns false on a
    /// read-only map.
    pub fn add_scalar(&mut self, feature: &str, primitive: DriverPrimitive) -> bool {
        if !self.writable {
            return false;
        }

        self.drop_feature(feature);
        self.unmap_primitive(primitive);
        self.features
            .insert(feature.to_string(), Feature::Scalar(primitive));
        self.driver_map.insert(primitive, feature.to_string());
        self.persist();
        true
    }

    /// Bind four directional primitives to an analog-stick feature.
    pub fn add_analog_stick(&mut self, feature: &str, stick: AnalogStick) -> bool {
        if !self.writable {
            return false;
        }

        self.drop_feature(feature);
        for primitive in stick.slots().iter().copied().flatten() {
            self.unmap_primitive(primitive);
            self.driver_map.insert(primitive, feature.to_string());
        }
        self.features
            .insert(feature.to_string(), Feature::AnalogStick(stick));
        self.persist();
        true
    }

    /// Bind three positive-axis primitives to an accelerometer feature.
    ///
    /// Each primitive's direction-negated counterpart is also indexed, so
    /// six reverse entries back the three logical axes.
    pub fn add_accelerometer(&mut self, feature: &str, accel: Accelerometer) -> bool {
        if !self.writable {
            return false;
        }

        self.drop_feature(feature);
        for primitive in accel.slots().iter().copied().flatten() {
            self.unmap_primitive(primitive);
            self.driver_map.insert(primitive, feature.to_string());
            if let Some(opposite) = primitive.opposite() {
                self.unmap_primitive(opposite);
                self.driver_map.insert(opposite, feature.to_string());
            }
        }
        self.features
            .insert(feature.to_string(), Feature::Accelerometer(accel));
        self.persist();
        true
    }

    /// Remove a feature and all of its reverse-index entries, so a
    /// re-added feature cannot leave stale primitives behind.
    fn drop_feature(&mut self, name: &str) {
        let Some(feature) = self.features.remove(name) else {
            return;
        };

        for primitive in feature.primitives() {
            self.driver_map.remove(&primitive);
            if feature.kind() == FeatureKind::Accelerometer {
                if let Some(opposite) = primitive.opposite() {
                    self.driver_map.remove(&opposite);
                }
            }
        }
    }

    /// Clear both the canonical store and the reverse index.
    pub fn reset(&mut self) -> bool {
        if !self.writable {
            return false;
        }

        self.features.clear();
        self.driver_map.clear();
        self.persist();
        true
    }

    /// Remove a primitive from whatever feature currently holds it.
    fn unmap_primitive(&mut self, primitive: DriverPrimitive) {
        let Some(name) = self.driver_map.remove(&primitive) else {
            return;
        };

        if let Some(feature) = self.features.get_mut(&name) {
            if feature.unbind(primitive) {
                self.features.remove(&name);
            }
        }
    }

    fn persist(&self) {
        if !self
            .store
            .save(&self.device_id, &self.controller_id, &self.features)
        {
            log::warn!(
                "Could not persist button map for controller {} on {}",
                self.controller_id,
                self.device_id
            );
        }
    }
}
