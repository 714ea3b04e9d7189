//! Device discovery boundary
//!
//! Enumeration of connected input devices is owned by an external
//! collaborator (a HID layer, a windowing backend). The boundary here is a
//! trait plus an explicit event channel; consumers subscribe and drain
//! [`DeviceEvent`]s at their own pace instead of inheriting an observer base
//! class.
//!
//! [`DeviceHub`] is a process-local implementation used by hosts that feed
//! devices in manually, and by tests.

use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;

/// Category of an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// A joystick or gamepad.
    Joystick,
    /// A keyboard.
    Keyboard,
    /// Unclassified device.
    Unknown,
}

/// A connected input device.
#[derive(Debug, Clone)]
pub struct Device {
    /// Stable identifier of the device.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Device category.
    pub kind: DeviceType,
    /// Port this device asks to be connected to, if it declares one.
    pub requested_port: Option<u32>,
}

impl Device {
    /// A joystick with no port preference.
    #[must_use]
    pub fn joystick(id: &str, name: &str) -> Self {
        Device {
            id: id.to_string(),
            name: name.to_string(),
            kind: DeviceType::Joystick,
            requested_port: None,
        }
    }

    /// Declare a preferred port.
    #[must_use]
    pub fn with_requested_port(mut self, port: u32) -> Self {
        self.requested_port = Some(port);
        self
    }
}

/// A change in the set of connected devices.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A device appeared.
    Added(Device),
    /// The device with this id disappeared.
    Removed(String),
}

/// Source of connected devices and change notifications.
pub trait DeviceDiscovery: Send + Sync {
    /// Snapshot of the currently connected devices.
    fn devices(&self) -> Vec<Device>;

    /// Subscribe to device changes.
    ///
    /// Every subscriber receives every event from the moment of
    /// subscription.
    fn subscribe(&self) -> Receiver<DeviceEvent>;
}

/// Process-local device registry implementing [`DeviceDiscovery`].
#[derive(Default)]
pub struct DeviceHub {
    devices: Mutex<Vec<Device>>,
    subscribers: Mutex<Vec<Sender<DeviceEvent>>>,
}

impl DeviceHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and notify subscribers.
    pub fn add_device(&self, device: Device) {
        self.devices.lock().push(device.clone());
        self.broadcast(DeviceEvent::Added(device));
    }

    /// Remove a device by id and notify subscribers.
    pub fn remove_device(&self, id: &str) {
        let mut devices = self.devices.lock();
        let before = devices.len();
        devices.retain(|device| device.id != id);
        let removed = devices.len() != before;
        drop(devices);

        if removed {
            self.broadcast(DeviceEvent::Removed(id.to_string()));
        }
    }

    fn broadcast(&self, event: DeviceEvent) {
        // Drop subscribers whose receiving end is gone
        self.subscribers
            .lock()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }
}

impl DeviceDiscovery for DeviceHub {
    fn devices(&self) -> Vec<Device> {
        self.devices.lock().clone()
    }

    fn subscribe(&self) -> Receiver<DeviceEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_enumerates_devices() {
        let hub = DeviceHub::new();
        hub.add_device(Device::joystick("js0", "Test Pad"));

        let devices = hub.devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "js0");
    }

    #[test]
    fn test_subscribers_see_add_and_remove() {
        let hub = DeviceHub::new();
        let events = hub.subscribe();

        hub.add_device(Device::joystick("js0", "Test Pad"));
        hub.remove_device("js0");

        assert!(matches!(events.try_recv(), Ok(DeviceEvent::Added(d)) if d.id == "js0"));
        assert!(matches!(events.try_recv(), Ok(DeviceEvent::Removed(id)) if id == "js0"));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_removing_unknown_device_is_silent() {
        let hub = DeviceHub::new();
        let events = hub.subscribe();

        hub.remove_device("nope");
        assert!(events.try_recv().is_err());
    }
}
