//! Controller input mapping for the retroplay game player
//!
//! This crate owns the path from raw driver events to the logical
//! controller features a game client consumes:
//!
//! - [`DriverPrimitive`] / [`Feature`]: value types for raw input sources
//!   and the logical capabilities they bind to
//! - [`ButtonMap`]: per-device, per-controller-profile bidirectional map
//!   with an O(1) reverse index, persisted through the [`ButtonMapStore`]
//!   boundary
//! - [`DriverTranslator`]: folds raw button/hat/axis events into feature
//!   calls on an [`InputHandler`]
//! - [`PortManager`] / [`PortMapper`]: assigns physical devices to the
//!   logical ports game clients open, and keeps the assignment current as
//!   devices come and go
//! - [`ConfigurationWizard`]: interactive "press the button for X" mapping
//!   state machine
//!
//! # Quick start
//! ```
//! use std::sync::Arc;
//! use retroplay_input::{
//!     ButtonMap, DriverPrimitive, MemoryButtonMapStore,
//! };
//!
//! let store = MemoryButtonMapStore::new();
//! let mut map = ButtonMap::new(store, "gamepad0", "game.controller.default");
//! map.add_scalar("a", DriverPrimitive::button(0));
//! assert_eq!(map.feature_for(DriverPrimitive::button(0)).unwrap(), "a");
//! ```

#![warn(missing_docs)]

pub mod button_map;
pub mod device;
pub mod feature;
pub mod handler;
pub mod mapper;
pub mod port_mapper;
pub mod ports;
pub mod primitive;
pub mod storage;
pub mod translator;
pub mod wizard;

// Public API exports
pub use button_map::ButtonMap;
pub use device::{Device, DeviceDiscovery, DeviceEvent, DeviceHub, DeviceType};
pub use feature::{
    Accelerometer, AnalogStick, CardinalDirection, Feature, FeatureKind, FeatureName,
};
pub use handler::InputHandler;
pub use mapper::{MapperSlot, PrimitiveMapper};
pub use port_mapper::PortMapper;
pub use ports::PortManager;
pub use primitive::{DriverPrimitive, HatDirection, SemiAxisDirection};
pub use storage::{ButtonMapStore, FeatureMap, MemoryButtonMapStore};
pub use translator::{DriverTranslator, ACTIVATION_THRESHOLD};
pub use wizard::{ConfigurationWizard, FeatureButton, WizardOptions, WizardState};
