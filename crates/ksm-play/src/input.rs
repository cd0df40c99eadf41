//! Per-frame input snapshot and key configuration.
//!
//! The input layer resolves raw device state through a [`KeyConfig`] into
//! an immutable [`InputSnapshot`] once per frame. Lane judgment only ever
//! sees the snapshot.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use ksm_model::LaneId;
use serde::{Deserialize, Serialize};

/// Logical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    BtA,
    BtB,
    BtC,
    BtD,
    FxL,
    FxR,
    Start,
    Back,
    AutoPlay,
    Up,
    Down,
    Left,
    Right,
}

pub const BUTTON_COUNT: usize = 13;

/// Buttons the user can rebind (BT, FX, Start, Back), in config value order.
pub const CONFIGURABLE_BUTTONS: [Button; 8] = [
    Button::BtA,
    Button::BtB,
    Button::BtC,
    Button::BtD,
    Button::FxL,
    Button::FxR,
    Button::Start,
    Button::Back,
];

impl Button {
    pub fn all() -> &'static [Button] {
        &[
            Button::BtA,
            Button::BtB,
            Button::BtC,
            Button::BtD,
            Button::FxL,
            Button::FxR,
            Button::Start,
            Button::Back,
            Button::AutoPlay,
            Button::Up,
            Button::Down,
            Button::Left,
            Button::Right,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<LaneId> for Button {
    fn from(lane: LaneId) -> Self {
        match lane {
            LaneId::BtA => Button::BtA,
            LaneId::BtB => Button::BtB,
            LaneId::BtC => Button::BtC,
            LaneId::BtD => Button::BtD,
            LaneId::FxL => Button::FxL,
            LaneId::FxR => Button::FxR,
        }
    }
}

/// State of a single button for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Whether the button is currently held down.
    pub pressed: bool,
    /// Whether the button was just pressed this frame.
    pub just_pressed: bool,
    /// Whether the button was just released this frame.
    pub just_released: bool,
}

impl ButtonState {
    /// Reset frame-specific state (just_pressed/just_released).
    /// Called at the start of each frame.
    pub fn reset_frame_state(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }

    pub fn on_press(&mut self) {
        if !self.pressed {
            self.pressed = true;
            self.just_pressed = true;
        }
    }

    pub fn on_release(&mut self) {
        if self.pressed {
            self.pressed = false;
            self.just_released = true;
        }
    }
}

/// Input state of every button, sampled once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSnapshot {
    buttons: [ButtonState; BUTTON_COUNT],
}

impl InputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, button: Button) -> ButtonState {
        self.buttons[button.index()]
    }

    pub fn set(&mut self, button: Button, state: ButtonState) {
        self.buttons[button.index()] = state;
    }

    pub fn lane(&self, lane: LaneId) -> ButtonState {
        self.get(Button::from(lane))
    }

    pub fn just_pressed(&self, button: Button) -> bool {
        self.get(button).just_pressed
    }

    pub fn pressed(&self, button: Button) -> bool {
        self.get(button).pressed
    }

    /// Snapshot with `buttons` pressed down this frame.
    pub fn with_pressed(buttons: &[Button]) -> Self {
        let mut snapshot = Self::new();
        for &button in buttons {
            snapshot.buttons[button.index()].on_press();
        }
        snapshot
    }

    pub fn button_mut(&mut self, button: Button) -> &mut ButtonState {
        &mut self.buttons[button.index()]
    }

    /// Clear edge flags, keeping held buttons held.
    pub fn reset_frame_state(&mut self) {
        for state in &mut self.buttons {
            state.reset_frame_state();
        }
    }

    fn buttons_mut(&mut self) -> &mut [ButtonState; BUTTON_COUNT] {
        &mut self.buttons
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Keyboard,
    Gamepad,
}

/// A physical key or gamepad button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInput {
    pub device: DeviceType,
    pub code: u8,
}

impl DeviceInput {
    pub fn keyboard(code: u8) -> Self {
        Self {
            device: DeviceType::Keyboard,
            code,
        }
    }

    pub fn gamepad(code: u8) -> Self {
        Self {
            device: DeviceType::Gamepad,
            code,
        }
    }
}

/// Raw device state for one frame, as reported by the polling layer.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub held: HashSet<DeviceInput>,
    pub pressed: HashSet<DeviceInput>,
    pub released: HashSet<DeviceInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigSet {
    Keyboard1,
    Keyboard2,
    Gamepad1,
    Gamepad2,
}

impl ConfigSet {
    pub fn all() -> &'static [ConfigSet] {
        &[
            ConfigSet::Keyboard1,
            ConfigSet::Keyboard2,
            ConfigSet::Gamepad1,
            ConfigSet::Gamepad2,
        ]
    }

    pub fn device(self) -> DeviceType {
        match self {
            ConfigSet::Keyboard1 | ConfigSet::Keyboard2 => DeviceType::Keyboard,
            ConfigSet::Gamepad1 | ConfigSet::Gamepad2 => DeviceType::Gamepad,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfigSet::Keyboard1 => "Keyboard 1",
            ConfigSet::Keyboard2 => "Keyboard 2",
            ConfigSet::Gamepad1 => "Gamepad 1",
            ConfigSet::Gamepad2 => "Gamepad 2",
        }
    }

    /// Default config value (BT A-D, FX L/R, Start, Back).
    pub fn default_config_value(self) -> &'static str {
        match self {
            // D, F, J, K, C, M, Enter, Backspace
            ConfigSet::Keyboard1 => "68,70,74,75,67,77,13,8",
            ConfigSet::Keyboard2 => "-1,-1,-1,-1,-1,-1,-1,-1",
            ConfigSet::Gamepad1 => "3,4,5,6,1,2,10,9",
            ConfigSet::Gamepad2 => "-1,-1,-1,-1,-1,-1,-1,-1",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

// Keyboard 1 keys that cannot be rebound
const KEY_ENTER: u8 = 13;
const KEY_ESCAPE: u8 = 27;
const KEY_LEFT: u8 = 37;
const KEY_UP: u8 = 38;
const KEY_RIGHT: u8 = 39;
const KEY_DOWN: u8 = 40;
const KEY_F11: u8 = 122;

type Bindings = [Option<DeviceInput>; BUTTON_COUNT];

/// Button bindings for every config set.
///
/// Passed explicitly to whoever builds the frame's [`InputSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConfig {
    sets: [Bindings; 4],
}

impl Default for KeyConfig {
    fn default() -> Self {
        let mut config = Self {
            sets: [[None; BUTTON_COUNT]; 4],
        };
        for &set in ConfigSet::all() {
            config.set_config_value(set, set.default_config_value());
        }
        config
    }
}

impl KeyConfig {
    /// Apply a comma-separated list of device codes to `set`.
    ///
    /// Codes outside `0..256` unbind the button. A value with the wrong
    /// number of entries or an unparsable entry is ignored with a warning
    /// and the set's default is applied instead.
    pub fn set_config_value(&mut self, set: ConfigSet, config_value: &str) {
        let codes = match Self::parse_config_value(config_value) {
            Ok(codes) => codes,
            Err(err) => {
                log::warn!("Key configuration ({}) is ignored: {:#}", set.name(), err);
                Self::parse_config_value(set.default_config_value()).unwrap_or_default()
            }
        };

        let device = set.device();
        let bindings = &mut self.sets[set.index()];
        for (button, code) in CONFIGURABLE_BUTTONS.iter().zip(codes) {
            bindings[button.index()] = u8::try_from(code)
                .ok()
                .map(|code| DeviceInput { device, code });
        }

        if set == ConfigSet::Keyboard1 {
            for (button, code) in [
                (Button::Start, KEY_ENTER),
                (Button::Back, KEY_ESCAPE),
                (Button::AutoPlay, KEY_F11),
                (Button::Up, KEY_UP),
                (Button::Down, KEY_DOWN),
                (Button::Left, KEY_LEFT),
                (Button::Right, KEY_RIGHT),
            ] {
                bindings[button.index()] = Some(DeviceInput::keyboard(code));
            }
        }
    }

    /// Current config value of `set`, in the format accepted by
    /// [`Self::set_config_value`].
    pub fn config_value(&self, set: ConfigSet) -> String {
        let bindings = &self.sets[set.index()];
        CONFIGURABLE_BUTTONS
            .iter()
            .map(|button| match bindings[button.index()] {
                Some(input) => input.code.to_string(),
                None => "-1".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn binding(&self, set: ConfigSet, button: Button) -> Option<DeviceInput> {
        self.sets[set.index()][button.index()]
    }

    /// Build this frame's snapshot from raw device state. A button is down
    /// if any config set's binding for it is, and only released once every
    /// binding is up.
    pub fn resolve(&self, raw: &RawInput) -> InputSnapshot {
        let mut snapshot = InputSnapshot::new();
        for (index, state) in snapshot.buttons_mut().iter_mut().enumerate() {
            for bindings in &self.sets {
                let Some(input) = bindings[index] else {
                    continue;
                };
                state.pressed |= raw.held.contains(&input);
                state.just_pressed |= raw.pressed.contains(&input);
                state.just_released |= raw.released.contains(&input);
            }
            state.just_released &= !state.pressed;
        }
        snapshot
    }

    fn parse_config_value(config_value: &str) -> Result<Vec<i32>> {
        let values: Vec<&str> = config_value.split(',').map(str::trim).collect();
        if values.len() != CONFIGURABLE_BUTTONS.len() {
            bail!(
                "value count does not match (expected: {}, actual: {})",
                CONFIGURABLE_BUTTONS.len(),
                values.len()
            );
        }
        values
            .iter()
            .map(|value| {
                value
                    .parse::<i32>()
                    .with_context(|| format!("parse error at '{}'", value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_state_press_release() {
        let mut state = ButtonState::default();
        state.on_press();
        assert!(state.pressed);
        assert!(state.just_pressed);

        state.reset_frame_state();
        state.on_press();
        assert!(!state.just_pressed);

        state.on_release();
        assert!(!state.pressed);
        assert!(state.just_released);
    }

    #[test]
    fn test_default_keyboard_bindings() {
        let config = KeyConfig::default();
        assert_eq!(
            config.binding(ConfigSet::Keyboard1, Button::BtA),
            Some(DeviceInput::keyboard(68))
        );
        assert_eq!(config.binding(ConfigSet::Keyboard2, Button::BtA), None);
        assert_eq!(
            config.binding(ConfigSet::Gamepad1, Button::FxL),
            Some(DeviceInput::gamepad(1))
        );
    }

    #[test]
    fn test_keyboard1_fixed_keys_override_config() {
        let mut config = KeyConfig::default();
        config.set_config_value(ConfigSet::Keyboard1, "1,2,3,4,5,6,7,8");
        assert_eq!(
            config.binding(ConfigSet::Keyboard1, Button::Start),
            Some(DeviceInput::keyboard(KEY_ENTER))
        );
        assert_eq!(
            config.binding(ConfigSet::Keyboard1, Button::Back),
            Some(DeviceInput::keyboard(KEY_ESCAPE))
        );
        assert_eq!(
            config.binding(ConfigSet::Keyboard1, Button::BtA),
            Some(DeviceInput::keyboard(1))
        );
    }

    #[test]
    fn test_wrong_count_falls_back_to_default() {
        let mut config = KeyConfig::default();
        config.set_config_value(ConfigSet::Gamepad1, "1,2,3");
        assert_eq!(
            config.config_value(ConfigSet::Gamepad1),
            ConfigSet::Gamepad1.default_config_value()
        );
    }

    #[test]
    fn test_parse_error_falls_back_to_default() {
        let mut config = KeyConfig::default();
        config.set_config_value(ConfigSet::Keyboard2, "1,2,x,4,5,6,7,8");
        assert_eq!(config.binding(ConfigSet::Keyboard2, Button::BtA), None);
    }

    #[test]
    fn test_out_of_range_code_unbinds() {
        let mut config = KeyConfig::default();
        config.set_config_value(ConfigSet::Keyboard2, "65,256,-1,66,67,68,69,70");
        assert_eq!(
            config.binding(ConfigSet::Keyboard2, Button::BtA),
            Some(DeviceInput::keyboard(65))
        );
        assert_eq!(config.binding(ConfigSet::Keyboard2, Button::BtB), None);
        assert_eq!(config.binding(ConfigSet::Keyboard2, Button::BtC), None);
    }

    #[test]
    fn test_resolve_merges_config_sets() {
        let config = KeyConfig::default();
        let mut raw = RawInput::default();
        raw.held.insert(DeviceInput::keyboard(68));
        raw.pressed.insert(DeviceInput::keyboard(68));
        raw.held.insert(DeviceInput::gamepad(2));

        let snapshot = config.resolve(&raw);
        assert!(snapshot.just_pressed(Button::BtA));
        assert!(snapshot.pressed(Button::FxR));
        assert!(!snapshot.just_pressed(Button::FxR));
        assert!(!snapshot.pressed(Button::BtB));
        assert_eq!(snapshot.lane(LaneId::BtA), snapshot.get(Button::BtA));
    }

    #[test]
    fn test_release_waits_for_every_binding() {
        let mut config = KeyConfig::default();
        config.set_config_value(ConfigSet::Keyboard2, "65,-1,-1,-1,-1,-1,-1,-1");

        // D (Keyboard 1) released while A (Keyboard 2) still holds BT-A
        let mut raw = RawInput::default();
        raw.released.insert(DeviceInput::keyboard(68));
        raw.held.insert(DeviceInput::keyboard(65));
        let state = config.resolve(&raw).get(Button::BtA);
        assert!(state.pressed);
        assert!(!state.just_released);

        // Both up
        let mut raw = RawInput::default();
        raw.released.insert(DeviceInput::keyboard(65));
        let state = config.resolve(&raw).get(Button::BtA);
        assert!(!state.pressed);
        assert!(state.just_released);
    }

    #[test]
    fn test_parse_config_value_errors() {
        let err = KeyConfig::parse_config_value("1,2").unwrap_err();
        assert!(err.to_string().contains("value count does not match"));
        let err = KeyConfig::parse_config_value("1,2,3,4,5,6,7,z").unwrap_err();
        assert!(err.to_string().contains("parse error at 'z'"));
        assert_eq!(
            KeyConfig::parse_config_value(" 1, 2,3,4,5,6,7,-1").expect("valid value"),
            vec![1, 2, 3, 4, 5, 6, 7, -1]
        );
    }
}
