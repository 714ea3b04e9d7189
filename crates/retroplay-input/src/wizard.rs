//! Configuration wizard
//!
//! Drives a "press the button for feature X" prompt sequence. The wizard
//! installs itself as the active primitive consumer (via [`MapperSlot`]),
//! then walks an ordered list of feature buttons: scalar features take one
//! primitive, analog sticks take one per cardinal direction, accelerometers
//! one per positive axis. Bindings commit to the device's button map as
//! soon as a feature's primitives are complete and are never rolled back.
//!
//! A worker thread owns the prompt timing: it blocks on a condvar between
//! steps and auto-skips the current button when the per-button timeout
//! elapses without input. `abort()` is safe from any thread and is observed
//! within one wait interval.

use std::collections::HashSet;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::button_map::ButtonMap;
use crate::device::{DeviceDiscovery, DeviceEvent};
use crate::feature::{
    Accelerometer, AnalogStick, CardinalDirection, FeatureKind, FeatureName,
};
use crate::mapper::{MapperSlot, PrimitiveMapper};
use crate::primitive::DriverPrimitive;
use crate::translator::ACTIVATION_THRESHOLD;

/// One feature to prompt for during a wizard run.
#[derive(Debug, Clone)]
pub struct FeatureButton {
    /// Feature to bind.
    pub feature: FeatureName,
    /// Kind of the feature, which determines how many prompts it takes.
    pub kind: FeatureKind,
}

impl FeatureButton {
    /// A scalar feature button.
    #[must_use]
    pub fn scalar(feature: &str) -> Self {
        FeatureButton {
            feature: feature.to_string(),
            kind: FeatureKind::Scalar,
        }
    }

    /// An analog-stick feature button.
    #[must_use]
    pub fn analog_stick(feature: &str) -> Self {
        FeatureButton {
            feature: feature.to_string(),
            kind: FeatureKind::AnalogStick,
        }
    }

    /// An accelerometer feature button.
    #[must_use]
    pub fn accelerometer(feature: &str) -> Self {
        FeatureButton {
            feature: feature.to_string(),
            kind: FeatureKind::Accelerometer,
        }
    }
}

/// Lifecycle states of a wizard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardState {
    /// No run in progress.
    #[default]
    Idle,
    /// Prompting for input.
    Running,
    /// All buttons prompted (some may have been skipped).
    Completed,
    /// Run cancelled; committed bindings are kept.
    Aborted,
}

/// Wizard tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct WizardOptions {
    /// How long to wait for input on one button before skipping it.
    pub button_timeout: Duration,
}

impl Default for WizardOptions {
    fn default() -> Self {
        WizardOptions {
            button_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Default)]
struct WizardData {
    state: WizardState,
    controller_id: String,
    buttons: Vec<FeatureButton>,
    current: usize,
    prompt: usize,
    pending: Vec<DriverPrimitive>,
    history: HashSet<DriverPrimitive>,
    // Bumped on every accepted primitive or skip, so the worker can tell a
    // productive wakeup from a timeout
    steps: u64,
}

impl WizardData {
    fn advance_button(&mut self) {
        self.current += 1;
        self.prompt = 0;
        self.pending.clear();
        self.steps += 1;
    }
}

/// Interactive button-mapping state machine.
pub struct ConfigurationWizard {
    data: Mutex<WizardData>,
    input_event: Condvar,
    slot: Arc<MapperSlot>,
    discovery: Option<Arc<dyn DeviceDiscovery>>,
    options: WizardOptions,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigurationWizard {
    /// Create a wizard that installs itself into `slot` while running.
    pub fn new(slot: Arc<MapperSlot>, options: WizardOptions) -> Arc<Self> {
        Arc::new(ConfigurationWizard {
            data: Mutex::new(WizardData::default()),
            input_event: Condvar::new(),
            slot,
            discovery: None,
            options,
            thread: Mutex::new(None),
        })
    }

    /// Create a wizard that re-asserts its input hook when the device set
    /// changes mid-run.
    pub fn with_discovery(
        slot: Arc<MapperSlot>,
        discovery: Arc<dyn DeviceDiscovery>,
        options: WizardOptions,
    ) -> Arc<Self> {
        Arc::new(ConfigurationWizard {
            data: Mutex::new(WizardData::default()),
            input_event: Condvar::new(),
            slot,
            discovery: Some(discovery),
            options,
            thread: Mutex::new(None),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WizardState {
        self.data.lock().state
    }

    /// The feature currently prompted, with the cardinal direction for
    /// analog sticks.
    #[must_use]
    pub fn current_prompt(&self) -> Option<(FeatureName, Option<CardinalDirection>)> {
        let data = self.data.lock();
        if data.state != WizardState::Running {
            return None;
        }

        let button = data.buttons.get(data.current)?;
        let direction = match button.kind {
            FeatureKind::AnalogStick => CardinalDirection::PROMPT_ORDER.get(data.prompt).copied(),
            _ => None,
        };
        Some((button.feature.clone(), direction))
    }

    /// Begin a mapping run for `controller_id` over `buttons`.
    ///
    /// Returns false if a run is already in progress. The wizard becomes
    /// the active primitive consumer until completion or abort.
    pub fn run(self: &Arc<Self>, controller_id: &str, buttons: Vec<FeatureButton>) -> bool {
        if self.state() == WizardState::Running {
            return false;
        }

        // A worker from a finished run may still be tearing down its hooks;
        // let it exit before installing ours
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }

        {
            let mut data = self.data.lock();
            if data.state == WizardState::Running {
                return false;
            }

            *data = WizardData {
                state: WizardState::Running,
                controller_id: controller_id.to_string(),
                buttons,
                ..WizardData::default()
            };
        }

        log::info!("Configuration wizard started for {controller_id}");
        self.install_hooks();

        let events = self.discovery.as_ref().map(|discovery| discovery.subscribe());
        let wizard = Arc::clone(self);
        let handle = thread::spawn(move || wizard.prompt_loop(events));
        *self.thread.lock() = Some(handle);
        true
    }

    /// Cancel prompting for one button without aborting the run.
    pub fn on_unfocus(&self, feature: &str) {
        let mut data = self.data.lock();
        if data.state != WizardState::Running {
            return;
        }

        let is_current = data
            .buttons
            .get(data.current)
            .is_some_and(|button| button.feature == feature);
        if is_current {
            data.advance_button();
            self.input_event.notify_all();
        }
    }

    /// Abort the run.
    ///
    /// Safe to call from any thread; the worker observes the abort within
    /// one wait interval. With `wait` the calling thread blocks until the
    /// worker has exited. Returns whether a run was in progress.
    pub fn abort(&self, wait: bool) -> bool {
        let was_running = {
            let mut data = self.data.lock();
            if data.state == WizardState::Running {
                data.state = WizardState::Aborted;
                true
            } else {
                false
            }
        };

        self.input_event.notify_all();

        if wait {
            if let Some(handle) = self.thread.lock().take() {
                let _ = handle.join();
            }
        }

        was_running
    }

    fn install_hooks(self: &Arc<Self>) {
        self.slot
            .install(Arc::clone(self) as Arc<dyn PrimitiveMapper>);
    }

    fn remove_hooks(self: &Arc<Self>) {
        let mapper = Arc::clone(self) as Arc<dyn PrimitiveMapper>;
        self.slot.uninstall(&mapper);
    }

    fn prompt_loop(self: Arc<Self>, events: Option<Receiver<DeviceEvent>>) {
        loop {
            // Device set changed mid-run: make sure we are still hooked in
            if let Some(receiver) = &events {
                let mut changed = false;
                while receiver.try_recv().is_ok() {
                    changed = true;
                }
                if changed {
                    log::debug!("Device set changed, re-installing wizard hooks");
                    self.install_hooks();
                }
            }

            let mut data = self.data.lock();
            if data.state != WizardState::Running {
                break;
            }
            if data.current >= data.buttons.len() {
                data.state = WizardState::Completed;
                log::info!(
                    "Configuration wizard finished for {}",
                    data.controller_id
                );
                break;
            }

            let steps_before = data.steps;
            let result = self
                .input_event
                .wait_for(&mut data, self.options.button_timeout);

            if data.state != WizardState::Running {
                break;
            }
            if result.timed_out() && data.steps == steps_before {
                // Nothing arrived for this button: move on without it
                if let Some(button) = data.buttons.get(data.current) {
                    log::debug!("No input for {}, skipping", button.feature);
                }
                data.advance_button();
            }
        }

        self.remove_hooks();
    }
}

impl PrimitiveMapper for ConfigurationWizard {
    fn controller_id(&self) -> String {
        self.data.lock().controller_id.clone()
    }

    fn map_primitive(
        &self,
        button_map: &mut ButtonMap,
        primitive: DriverPrimitive,
        magnitude: f32,
    ) -> bool {
        let mut data = self.data.lock();

        if data.state != WizardState::Running {
            return false;
        }
        // Debounce noisy analog input
        if magnitude < ACTIVATION_THRESHOLD {
            return false;
        }
        // Each primitive may bind at most once per run
        if data.history.contains(&primitive) {
            return false;
        }

        let Some(button) = data.buttons.get(data.current) else {
            return false;
        };
        let feature = button.feature.clone();

        match button.kind {
            FeatureKind::Scalar => {
                button_map.add_scalar(&feature, primitive);
                data.advance_button();
            }
            FeatureKind::AnalogStick => {
                data.pending.push(primitive);
                if data.pending.len() == CardinalDirection::PROMPT_ORDER.len() {
                    button_map.add_analog_stick(
                        &feature,
                        AnalogStick {
                            up: Some(data.pending[0]),
                            down: Some(data.pending[1]),
                            right: Some(data.pending[2]),
                            left: Some(data.pending[3]),
                        },
                    );
                    data.advance_button();
                } else {
                    data.prompt += 1;
                    data.steps += 1;
                }
            }
            FeatureKind::Accelerometer => {
                data.pending.push(primitive);
                if data.pending.len() == 3 {
                    button_map.add_accelerometer(
                        &feature,
                        Accelerometer {
                            positive_x: Some(data.pending[0]),
                            positive_y: Some(data.pending[1]),
                            positive_z: Some(data.pending[2]),
                        },
                    );
                    data.advance_button();
                } else {
                    data.prompt += 1;
                    data.steps += 1;
                }
            }
        }

        data.history.insert(primitive);
        self.input_event.notify_all();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryButtonMapStore;
    use std::time::Instant;

    fn test_map() -> ButtonMap {
        ButtonMap::new(MemoryButtonMapStore::new(), "gp", "ctl")
    }

    fn short_timeout() -> WizardOptions {
        WizardOptions {
            button_timeout: Duration::from_millis(200),
        }
    }

    fn wait_for_state(wizard: &ConfigurationWizard, state: WizardState) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while wizard.state() != state {
            assert!(Instant::now() < deadline, "timed out waiting for {state:?}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_scalar_run_completes() {
        let slot = MapperSlot::new();
        let wizard = ConfigurationWizard::new(Arc::clone(&slot), WizardOptions::default());
        let mut map = test_map();

        assert!(wizard.run(
            "ctl",
            vec![FeatureButton::scalar("a"), FeatureButton::scalar("b")],
        ));
        assert!(slot.current().is_some());

        assert!(wizard.map_primitive(&mut map, DriverPrimitive::button(0), 1.0));
        assert!(wizard.map_primitive(&mut map, DriverPrimitive::button(1), 1.0));

        wait_for_state(&wizard, WizardState::Completed);
        assert_eq!(map.scalar("a"), Some(DriverPrimitive::button(0)));
        assert_eq!(map.scalar("b"), Some(DriverPrimitive::button(1)));
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_repeated_primitive_rejected() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), WizardOptions::default());
        let mut map = test_map();

        wizard.run(
            "ctl",
            vec![FeatureButton::scalar("a"), FeatureButton::scalar("b")],
        );

        assert!(wizard.map_primitive(&mut map, DriverPrimitive::button(0), 1.0));
        assert!(!wizard.map_primitive(&mut map, DriverPrimitive::button(0), 1.0));

        wizard.abort(true);
    }

    #[test]
    fn test_below_threshold_rejected() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), WizardOptions::default());
        let mut map = test_map();

        wizard.run("ctl", vec![FeatureButton::scalar("a")]);
        assert!(!wizard.map_primitive(&mut map, DriverPrimitive::button(0), 0.2));
        assert_eq!(map.scalar("a"), None);

        wizard.abort(true);
    }

    #[test]
    fn test_analog_stick_commits_after_four_prompts() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), WizardOptions::default());
        let mut map = test_map();

        wizard.run("ctl", vec![FeatureButton::analog_stick("leftstick")]);

        for index in 0..4 {
            assert!(wizard.map_primitive(&mut map, DriverPrimitive::button(index), 1.0));
        }

        wait_for_state(&wizard, WizardState::Completed);
        let stick = map.analog_stick("leftstick").unwrap();
        assert_eq!(stick.up, Some(DriverPrimitive::button(0)));
        assert_eq!(stick.down, Some(DriverPrimitive::button(1)));
        assert_eq!(stick.right, Some(DriverPrimitive::button(2)));
        assert_eq!(stick.left, Some(DriverPrimitive::button(3)));
    }

    #[test]
    fn test_prompt_reports_cardinal_direction() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), WizardOptions::default());
        let mut map = test_map();

        wizard.run("ctl", vec![FeatureButton::analog_stick("leftstick")]);
        assert_eq!(
            wizard.current_prompt(),
            Some(("leftstick".to_string(), Some(CardinalDirection::Up)))
        );

        wizard.map_primitive(&mut map, DriverPrimitive::button(0), 1.0);
        assert_eq!(
            wizard.current_prompt(),
            Some(("leftstick".to_string(), Some(CardinalDirection::Down)))
        );

        wizard.abort(true);
    }

    #[test]
    fn test_timeout_skips_button() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), short_timeout());
        let mut map = test_map();

        wizard.run(
            "ctl",
            vec![FeatureButton::scalar("a"), FeatureButton::scalar("b")],
        );

        // Let "a" time out, then bind "b" as soon as it is prompted
        let deadline = Instant::now() + Duration::from_secs(2);
        while wizard.current_prompt().map(|(feature, _)| feature).as_deref() != Some("b") {
            assert!(Instant::now() < deadline, "wizard never advanced past 'a'");
            thread::sleep(Duration::from_millis(1));
        }
        wizard.map_primitive(&mut map, DriverPrimitive::button(9), 1.0);

        wait_for_state(&wizard, WizardState::Completed);
        assert_eq!(map.scalar("a"), None);
        assert_eq!(map.scalar("b"), Some(DriverPrimitive::button(9)));
    }

    #[test]
    fn test_abort_keeps_committed_bindings() {
        let slot = MapperSlot::new();
        let wizard = ConfigurationWizard::new(Arc::clone(&slot), WizardOptions::default());
        let mut map = test_map();

        wizard.run(
            "ctl",
            vec![FeatureButton::scalar("a"), FeatureButton::scalar("b")],
        );
        wizard.map_primitive(&mut map, DriverPrimitive::button(0), 1.0);

        assert!(wizard.abort(true));
        assert_eq!(wizard.state(), WizardState::Aborted);
        assert_eq!(map.scalar("a"), Some(DriverPrimitive::button(0)));
        assert!(slot.current().is_none());

        // Aborting twice reports no run in progress
        assert!(!wizard.abort(true));
    }

    #[test]
    fn test_unfocus_skips_only_current_button() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), WizardOptions::default());
        let mut map = test_map();

        wizard.run(
            "ctl",
            vec![FeatureButton::scalar("a"), FeatureButton::scalar("b")],
        );

        wizard.on_unfocus("b"); // not the current button, ignored
        assert_eq!(
            wizard.current_prompt().map(|(feature, _)| feature),
            Some("a".to_string())
        );

        wizard.on_unfocus("a");
        assert_eq!(
            wizard.current_prompt().map(|(feature, _)| feature),
            Some("b".to_string())
        );

        wizard.abort(true);
    }

    #[test]
    fn test_run_while_running_refused() {
        let wizard = ConfigurationWizard::new(MapperSlot::new(), WizardOptions::default());

        assert!(wizard.run("ctl", vec![FeatureButton::scalar("a")]));
        assert!(!wizard.run("ctl", vec![FeatureButton::scalar("b")]));

        wizard.abort(true);
    }
}
