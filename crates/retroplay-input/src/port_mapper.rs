//! Port mapper
//!
//! Glue between device discovery and the port manager: keeps the
//! device-to-handler routing table current as devices come and go. The
//! mapper drains its event subscription on demand; hosts call
//! [`PortMapper::process_events`] from their input pump (or
//! [`PortMapper::refresh`] after opening/closing ports).

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{DeviceDiscovery, DeviceEvent};
use crate::handler::InputHandler;
use crate::ports::PortManager;

/// Keeps devices routed to port handlers across device-set changes.
pub struct PortMapper {
    discovery: Arc<dyn DeviceDiscovery>,
    ports: Arc<PortManager>,
    events: Mutex<Receiver<DeviceEvent>>,
    routing: Mutex<HashMap<String, Arc<dyn InputHandler>>>,
}

impl PortMapper {
    /// Create a mapper and compute the initial routing table.
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, ports: Arc<PortManager>) -> Self {
        let events = discovery.subscribe();
        let mapper = PortMapper {
            discovery,
            ports,
            events: Mutex::new(events),
            routing: Mutex::new(HashMap::new()),
        };
        mapper.refresh();
        mapper
    }

    /// Drain pending device events; remap if anything changed.
    pub fn process_events(&self) {
        let mut changed = false;
        {
            let events = self.events.lock();
            while events.try_recv().is_ok() {
                changed = true;
            }
        }

        if changed {
            self.refresh();
        }
    }

    /// Recompute the routing table from the current device set.
    pub fn refresh(&self) {
        let devices = self.discovery.devices();
        let routing = self.ports.map_devices(&devices);
        log::debug!("Mapped {} of {} devices to ports", routing.len(), devices.len());
        *self.routing.lock() = routing;
    }

    /// Handler currently assigned to `device_id`, if any.
    #[must_use]
    pub fn route(&self, device_id: &str) -> Option<Arc<dyn InputHandler>> {
        self.routing.lock().get(device_id).cloned()
    }
}
