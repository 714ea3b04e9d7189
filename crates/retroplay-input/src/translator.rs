//! Driver event translation
//!
//! Turns raw driver events (button indices, hat directions, axis positions)
//! into logical controller-feature calls on an [`InputHandler`], using the
//! device's [`ButtonMap`] as the lookup table. Multi-axis features keep
//! per-direction state here so each raw event can be folded into a complete
//! (x, y) or (x, y, z) update.
//!
//! While a mapper is installed in the [`MapperSlot`], raw primitives are
//! diverted to it and normal dispatch is suppressed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::button_map::ButtonMap;
use crate::feature::{FeatureKind, FeatureName};
use crate::handler::InputHandler;
use crate::mapper::MapperSlot;
use crate::primitive::{DriverPrimitive, HatDirection, SemiAxisDirection};

/// Minimum magnitude for an analog primitive to count as activated.
pub const ACTIVATION_THRESHOLD: f32 = 0.5;

/// Per-device translator from raw driver events to feature events.
pub struct DriverTranslator {
    button_map: ButtonMap,
    handler: Arc<dyn InputHandler>,
    mapper_slot: Option<Arc<MapperSlot>>,
    // Per-feature magnitudes: up, down, right, left
    stick_state: HashMap<FeatureName, [f32; 4]>,
    // Per-feature signed axis values: x, y, z
    accel_state: HashMap<FeatureName, [f32; 3]>,
}

impl DriverTranslator {
    /// Create a translator for one device.
    pub fn new(button_map: ButtonMap, handler: Arc<dyn InputHandler>) -> Self {
        DriverTranslator {
            button_map,
            handler,
            mapper_slot: None,
            stick_state: HashMap::new(),
            accel_state: HashMap::new(),
        }
    }

    /// Divert primitives to an installed mapper while one is active.
    #[must_use]
    pub fn with_mapper_slot(mut self, slot: Arc<MapperSlot>) -> Self {
        self.mapper_slot = Some(slot);
        self
    }

    /// The device's button map.
    #[must_use]
    pub fn button_map(&self) -> &ButtonMap {
        &self.button_map
    }

    /// Mutable access to the device's button map (for loading).
    pub fn button_map_mut(&mut self) -> &mut ButtonMap {
        &mut self.button_map
    }

    /// A driver button changed state.
    pub fn on_button(&mut self, index: u32, pressed: bool) -> bool {
        let magnitude = if pressed { 1.0 } else { 0.0 };
        self.process(DriverPrimitive::button(index), magnitude)
    }

    /// A hat direction changed state.
    pub fn on_hat(&mut self, index: u32, direction: HatDirection, pressed: bool) -> bool {
        let magnitude = if pressed { 1.0 } else { 0.0 };
        self.process(DriverPrimitive::hat(index, direction), magnitude)
    }

    /// An axis moved to `position` in `[-1.0, 1.0]`.
    ///
    /// Both semi-axes are updated so releasing one polarity clears it while
    /// the other activates.
    pub fn on_axis(&mut self, index: u32, position: f32) -> bool {
        let positive = self.process(
            DriverPrimitive::semi_axis(index, SemiAxisDirection::Positive),
            position.max(0.0),
        );
        let negative = self.process(
            DriverPrimitive::semi_axis(index, SemiAxisDirection::Negative),
            (-position).max(0.0),
        );
        positive || negative
    }

    fn process(&mut self, primitive: DriverPrimitive, magnitude: f32) -> bool {
        if let Some(slot) = &self.mapper_slot {
            if let Some(mapper) = slot.current() {
                // Mapping in progress: the wizard consumes (or rejects) the
                // primitive and the game never sees it
                return mapper.map_primitive(&mut self.button_map, primitive, magnitude);
            }
        }

        let Some(feature) = self.button_map.feature_for(primitive).cloned() else {
            return false;
        };

        match self.button_map.feature_kind(&feature) {
            Some(FeatureKind::Scalar) => self.dispatch_scalar(&feature, primitive, magnitude),
            Some(FeatureKind::AnalogStick) => self.dispatch_stick(&feature, primitive, magnitude),
            Some(FeatureKind::Accelerometer) => self.dispatch_accel(&feature, primitive, magnitude),
            None => false,
        }
    }

    fn dispatch_scalar(
        &mut self,
        feature: &str,
        primitive: DriverPrimitive,
        magnitude: f32,
    ) -> bool {
        match primitive {
            DriverPrimitive::SemiAxis { .. } => self.handler.on_button_motion(feature, magnitude),
            _ => self
                .handler
                .on_button_press(feature, magnitude >= ACTIVATION_THRESHOLD),
        }
    }

    fn dispatch_stick(
        &mut self,
        feature: &str,
        primitive: DriverPrimitive,
        magnitude: f32,
    ) -> bool {
        let Some(stick) = self.button_map.analog_stick(feature) else {
            return false;
        };

        let state = self
            .stick_state
            .entry(feature.to_string())
            .or_insert([0.0; 4]);

        for (slot, bound) in stick.slots().iter().enumerate() {
            if *bound == Some(primitive) {
                state[slot] = magnitude;
            }
        }

        let x = state[2] - state[3]; // right - left
        let y = state[0] - state[1]; // up - down
        self.handler.on_analog_stick_motion(feature, x, y)
    }

    fn dispatch_accel(
        &mut self,
        feature: &str,
        primitive: DriverPrimitive,
        magnitude: f32,
    ) -> bool {
        let Some(accel) = self.button_map.accelerometer(feature) else {
            return false;
        };

        let state = self
            .accel_state
            .entry(feature.to_string())
            .or_insert([0.0; 3]);

        for (axis, bound) in accel.slots().iter().enumerate() {
            let Some(positive) = *bound else { continue };
            if positive == primitive {
                state[axis] = magnitude;
            } else if positive.opposite() == Some(primitive) {
                state[axis] = -magnitude;
            }
        }

        self.handler
            .on_accelerometer_motion(feature, state[0], state[1], state[2])
    }
}
