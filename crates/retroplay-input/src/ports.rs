//! Port manager
//!
//! Game clients open logical ports; physical devices are assigned to those
//! ports for the lifetime of a mapping pass. Ports exist only while a
//! handler holds them (opened on `open_port`, gone on `close_port`), so a
//! device can never be routed to a port nobody is listening on.
//!
//! Assignment is deterministic: a device's requested port is honored
//! whenever that port is at the global minimum device count, otherwise the
//! device falls to the least-loaded eligible port, ties broken by ascending
//! port number. After a full pass no port holds more than one device above
//! any other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::{Device, DeviceType};
use crate::handler::InputHandler;

struct Port {
    number: u32,
    device_type: DeviceType,
    handler: Arc<dyn InputHandler>,
    devices: Vec<String>,
}

impl Port {
    fn accepts(&self, kind: DeviceType) -> bool {
        self.device_type == DeviceType::Unknown || self.device_type == kind
    }
}

/// Manages the logical input ports opened by game clients.
#[derive(Default)]
pub struct PortManager {
    ports: Mutex<Vec<Port>>,
}

impl PortManager {
    /// Create a manager with no open ports.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a port, sending its input to `handler`.
    ///
    /// `device_type` restricts which devices the port accepts;
    /// [`DeviceType::Unknown`] accepts any.
    pub fn open_port(
        &self,
        handler: Arc<dyn InputHandler>,
        port_number: u32,
        device_type: DeviceType,
    ) {
        let mut ports = self.ports.lock();
        ports.push(Port {
            number: port_number,
            device_type,
            handler,
            devices: Vec::new(),
        });
        ports.sort_by_key(|port| port.number);
        log::debug!("Opened port {port_number}");
    }

    /// Close the port that was opened with `handler`.
    pub fn close_port(&self, handler: &Arc<dyn InputHandler>) {
        let mut ports = self.ports.lock();
        ports.retain(|port| !Arc::ptr_eq(&port.handler, handler));
    }

    /// Number of currently open ports.
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.ports.lock().len()
    }

    /// Assign `devices` to the open ports.
    ///
    /// Devices are processed in input order; the previous assignment is
    /// discarded. Returns the device-id to handler routing table.
    pub fn map_devices(&self, devices: &[Device]) -> HashMap<String, Arc<dyn InputHandler>> {
        let mut ports = self.ports.lock();
        for port in ports.iter_mut() {
            port.devices.clear();
        }

        let mut routing: HashMap<String, Arc<dyn InputHandler>> = HashMap::new();

        for device in devices {
            let Some(index) = Self::target_port(&ports, device.requested_port, device.kind) else {
                log::debug!("No open port accepts device {}", device.id);
                continue;
            };

            ports[index].devices.push(device.id.clone());
            routing.insert(device.id.clone(), Arc::clone(&ports[index].handler));
            log::debug!("Device {} assigned to port {}", device.id, ports[index].number);
        }

        routing
    }

    /// Pick the port for one device.
    ///
    /// A port is considered open for assignment when no other eligible port
    /// has fewer devices connected.
    fn target_port(ports: &[Port], requested: Option<u32>, kind: DeviceType) -> Option<usize> {
        let eligible: Vec<usize> = ports
            .iter()
            .enumerate()
            .filter(|(_, port)| port.accepts(kind))
            .map(|(index, _)| index)
            .collect();

        let min_count = eligible
            .iter()
            .map(|&index| ports[index].devices.len())
            .min()?;

        if let Some(number) = requested {
            if let Some(&index) = eligible
                .iter()
                .find(|&&index| ports[index].number == number)
            {
                if ports[index].devices.len() == min_count {
                    return Some(index);
                }
            }
        }

        // Ports are kept sorted by number, so the first minimum-count port
        // is the lowest-numbered one
        eligible
            .iter()
            .copied()
            .find(|&index| ports[index].devices.len() == min_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHandler;

    impl InputHandler for NullHandler {
        fn controller_id(&self) -> String {
            "game.controller.default".to_string()
        }

        fn on_button_press(&self, _feature: &str, _pressed: bool) -> bool {
            true
        }

        fn on_button_motion(&self, _feature: &str, _magnitude: f32) -> bool {
            true
        }

        fn on_analog_stick_motion(&self, _feature: &str, _x: f32, _y: f32) -> bool {
            true
        }

        fn on_accelerometer_motion(&self, _feature: &str, _x: f32, _y: f32, _z: f32) -> bool {
            true
        }
    }

    fn handler() -> Arc<dyn InputHandler> {
        Arc::new(NullHandler)
    }

    fn joysticks(count: usize) -> Vec<Device> {
        (0..count)
            .map(|i| Device::joystick(&format!("js{i}"), "Test Pad"))
            .collect()
    }

    #[test]
    fn test_no_ports_no_assignment() {
        let manager = PortManager::new();
        let routing = manager.map_devices(&joysticks(2));
        assert!(routing.is_empty());
    }

    #[test]
    fn test_requested_port_is_honored() {
        let manager = PortManager::new();
        for number in 1..=3 {
            manager.open_port(handler(), number, DeviceType::Joystick);
        }

        let device = Device::joystick("js0", "Test Pad").with_requested_port(2);
        let routing = manager.map_devices(&[device]);
        assert_eq!(routing.len(), 1);

        // A second device with no preference lands on the lowest-numbered
        // empty port
        let devices = vec![
            Device::joystick("js0", "Test Pad").with_requested_port(2),
            Device::joystick("js1", "Test Pad"),
        ];
        let routing = manager.map_devices(&devices);
        assert_eq!(routing.len(), 2);
        assert!(!Arc::ptr_eq(&routing["js0"], &routing["js1"]));
    }

    #[test]
    fn test_assignment_balances_within_one() {
        let manager = PortManager::new();
        let handlers: Vec<Arc<dyn InputHandler>> = (0..3).map(|_| handler()).collect();
        for (number, h) in handlers.iter().enumerate() {
            manager.open_port(Arc::clone(h), number as u32, DeviceType::Joystick);
        }

        let routing = manager.map_devices(&joysticks(7));
        assert_eq!(routing.len(), 7);

        let mut counts = [0usize; 3];
        for assigned in routing.values() {
            for (slot, h) in handlers.iter().enumerate() {
                if Arc::ptr_eq(assigned, h) {
                    counts[slot] += 1;
                }
            }
        }

        let max = counts.iter().max().unwrap();
        let min = counts.iter().min().unwrap();
        assert!(max - min <= 1, "unbalanced assignment: {counts:?}");
    }

    #[test]
    fn test_over_capacity_request_falls_back() {
        let manager = PortManager::new();
        let h1 = handler();
        let h2 = handler();
        manager.open_port(Arc::clone(&h1), 1, DeviceType::Joystick);
        manager.open_port(Arc::clone(&h2), 2, DeviceType::Joystick);

        // Both devices ask for port 2; the second must spill to port 1
        let devices = vec![
            Device::joystick("js0", "Test Pad").with_requested_port(2),
            Device::joystick("js1", "Test Pad").with_requested_port(2),
        ];
        let routing = manager.map_devices(&devices);

        assert!(Arc::ptr_eq(&routing["js0"], &h2));
        assert!(Arc::ptr_eq(&routing["js1"], &h1));
    }

    #[test]
    fn test_device_type_restricts_port() {
        let manager = PortManager::new();
        manager.open_port(handler(), 1, DeviceType::Keyboard);

        let routing = manager.map_devices(&joysticks(1));
        assert!(routing.is_empty());
    }

    #[test]
    fn test_close_port_removes_it() {
        let manager = PortManager::new();
        let h = handler();
        manager.open_port(Arc::clone(&h), 1, DeviceType::Joystick);
        assert_eq!(manager.port_count(), 1);

        manager.close_port(&h);
        assert_eq!(manager.port_count(), 0);
        assert!(manager.map_devices(&joysticks(1)).is_empty());
    }

    #[test]
    fn test_scenario_request_then_no_preference() {
        // D requests port 2 with ports {1,2,3} empty, then E with no
        // preference lands on port 1
        let manager = PortManager::new();
        let handlers: Vec<Arc<dyn InputHandler>> = (0..3).map(|_| handler()).collect();
        for (i, h) in handlers.iter().enumerate() {
            manager.open_port(Arc::clone(h), (i + 1) as u32, DeviceType::Joystick);
        }

        let devices = vec![
            Device::joystick("d", "Pad D").with_requested_port(2),
            Device::joystick("e", "Pad E"),
        ];
        let routing = manager.map_devices(&devices);

        assert!(Arc::ptr_eq(&routing["d"], &handlers[1])); // port 2
        assert!(Arc::ptr_eq(&routing["e"], &handlers[0])); // port 1
    }
}
