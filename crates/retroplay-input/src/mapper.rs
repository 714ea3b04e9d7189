//! Active button-mapper slot
//!
//! While a configuration wizard runs it installs itself here; driver
//! translators divert raw primitives to the installed mapper instead of
//! the normal handler path. At most one mapper is active at a time, and
//! installation is idempotent so a wizard can re-assert its hook when the
//! device set changes mid-run.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::button_map::ButtonMap;
use crate::primitive::DriverPrimitive;

/// Consumer of raw primitives during a mapping run.
pub trait PrimitiveMapper: Send + Sync {
    /// Controller profile being mapped.
    fn controller_id(&self) -> String;

    /// Offer a raw primitive to the mapper.
    ///
    /// `button_map` is the map of the device that produced the primitive.
    /// Returns false when the primitive was not consumed (already seen this
    /// run, below the activation threshold, or no prompt in progress).
    fn map_primitive(
        &self,
        button_map: &mut ButtonMap,
        primitive: DriverPrimitive,
        magnitude: f32,
    ) -> bool;
}

/// Mutex-guarded slot holding the active mapper, if any.
#[derive(Default)]
pub struct MapperSlot {
    active: Mutex<Option<Arc<dyn PrimitiveMapper>>>,
}

impl MapperSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install `mapper` as the active primitive consumer.
    pub fn install(&self, mapper: Arc<dyn PrimitiveMapper>) {
        *self.active.lock() = Some(mapper);
    }

    /// Clear the slot if `mapper` is the one installed.
    pub fn uninstall(&self, mapper: &Arc<dyn PrimitiveMapper>) {
        let mut active = self.active.lock();
        if let Some(current) = active.as_ref() {
            if Arc::ptr_eq(current, mapper) {
                *active = None;
            }
        }
    }

    /// The currently installed mapper, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn PrimitiveMapper>> {
        self.active.lock().clone()
    }
}
