/// Gamepad support via gilrs (feature "gamepad").
///
/// Face and shoulder buttons map to actions through `[gamepad]` in
/// config.toml. Movement comes from the left stick when it is deflected,
/// otherwise from the d-pad. Without the feature every query reports idle.

use std::collections::HashSet;

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::MoveIntent;

const STICK_DEADZONE: f32 = 0.25;

/// Physical buttons the game cares about. Face buttons use Xbox names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    Start,
    Select,
    Up,
    Down,
    Left,
    Right,
}

/// Accepted spellings in config.toml, matched case-insensitively.
const BUTTON_NAMES: &[(&str, Btn)] = &[
    ("a", Btn::A), ("south", Btn::A),
    ("b", Btn::B), ("east", Btn::B),
    ("x", Btn::X), ("west", Btn::X),
    ("y", Btn::Y), ("north", Btn::Y),
    ("l1", Btn::L1), ("lb", Btn::L1),
    ("r1", Btn::R1), ("rb", Btn::R1),
    ("start", Btn::Start), ("menu", Btn::Start),
    ("select", Btn::Select), ("back", Btn::Select), ("view", Btn::Select),
];

impl Btn {
    fn from_name(name: &str) -> Option<Btn> {
        let name = name.trim().to_ascii_lowercase();
        BUTTON_NAMES.iter().find(|(n, _)| *n == name).map(|&(_, b)| b)
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        Some(match btn {
            Button::South => Btn::A,
            Button::East => Btn::B,
            Button::West => Btn::X,
            Button::North => Btn::Y,
            Button::LeftTrigger => Btn::L1,
            Button::RightTrigger => Btn::R1,
            Button::Start | Button::Mode => Btn::Start,
            Button::Select => Btn::Select,
            Button::DPadUp => Btn::Up,
            Button::DPadDown => Btn::Down,
            Button::DPadLeft => Btn::Left,
            Button::DPadRight => Btn::Right,
            _ => return None,
        })
    }
}

/// Which buttons trigger which game action.
#[derive(Clone, Debug, PartialEq)]
struct Bindings {
    spawn_echo: Vec<Btn>,
    restart: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for Bindings {
    fn default() -> Self {
        Bindings {
            spawn_echo: vec![Btn::A, Btn::X],
            restart: vec![Btn::Y],
            confirm: vec![Btn::Start],
            cancel: vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    held: HashSet<Btn>,
    /// Buttons that went down since the last `update`.
    pressed: HashSet<Btn>,
    stick: (f32, f32),
    bindings: Bindings,
    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = Gilrs::new().ok();
        #[cfg(feature = "gamepad")]
        let connected = gilrs.as_ref().is_some_and(|g| g.gamepads().next().is_some());
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            held: HashSet::new(),
            pressed: HashSet::new(),
            stick: (0.0, 0.0),
            bindings: Bindings::default(),
            connected,
        }
    }

    /// Apply `[gamepad]` overrides. A list with no recognised names keeps its default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let rebind = |slot: &mut Vec<Btn>, names: &[String]| {
            let btns: Vec<Btn> = names.iter().filter_map(|n| Btn::from_name(n)).collect();
            if !btns.is_empty() {
                *slot = btns;
            }
        };
        rebind(&mut self.bindings.spawn_echo, &cfg.spawn_echo);
        rebind(&mut self.bindings.restart, &cfg.restart);
        rebind(&mut self.bindings.confirm, &cfg.confirm);
        rebind(&mut self.bindings.cancel, &cfg.cancel);
    }

    /// Drain pending gilrs events. Once per frame, before any query.
    pub fn update(&mut self) {
        self.pressed.clear();
        #[cfg(feature = "gamepad")]
        self.drain_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn drain_gilrs(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else { return };
        let mut batch = Vec::new();
        while let Some(ev) = gilrs.next_event() {
            batch.push(ev.event);
        }

        for event in batch {
            match event {
                EventType::ButtonPressed(b, _) => {
                    if let Some(btn) = Btn::from_gilrs(b) {
                        self.press(btn);
                    }
                }
                EventType::ButtonReleased(b, _) => {
                    if let Some(btn) = Btn::from_gilrs(b) {
                        self.held.remove(&btn);
                    }
                }
                EventType::AxisChanged(Axis::LeftStickX, v, _) => self.stick.0 = v,
                EventType::AxisChanged(Axis::LeftStickY, v, _) => self.stick.1 = v,
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    self.connected = false;
                    self.held.clear();
                    self.stick = (0.0, 0.0);
                }
                _ => {}
            }
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn press(&mut self, btn: Btn) {
        self.connected = true;
        if self.held.insert(btn) {
            self.pressed.insert(btn);
        }
    }

    fn any_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|b| self.pressed.contains(b))
    }

    pub fn spawn_echo_pressed(&self) -> bool {
        self.any_pressed(&self.bindings.spawn_echo)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_pressed(&self.bindings.restart)
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(&self.bindings.confirm)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_pressed(&self.bindings.cancel)
    }

    /// Stick past the deadzone gives analog speed up to 1; otherwise the d-pad.
    pub fn intent(&self) -> MoveIntent {
        // gilrs Y is up-positive, screen rows grow downward.
        let (x, y) = (self.stick.0, -self.stick.1);
        let len = x.hypot(y);
        if len > STICK_DEADZONE {
            let k = 1.0 / len.max(1.0);
            return MoveIntent { x: x * k, y: y * k };
        }
        let h = |b: Btn| self.held.contains(&b);
        MoveIntent::from_keys(h(Btn::Up), h(Btn::Down), h(Btn::Left), h(Btn::Right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_parse_case_insensitively() {
        assert_eq!(Btn::from_name("South"), Some(Btn::A));
        assert_eq!(Btn::from_name(" BACK "), Some(Btn::Select));
        assert_eq!(Btn::from_name("rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_only_recognised_lists() {
        let mut gp = GamepadState::new();
        let cfg = GamepadConfig {
            spawn_echo: vec!["B".into()],
            restart: vec!["nonsense".into()],
            confirm: vec![],
            cancel: vec!["Start".into()],
        };
        gp.load_button_config(&cfg);
        assert_eq!(gp.bindings.spawn_echo, vec![Btn::B]);
        assert_eq!(gp.bindings.restart, vec![Btn::Y]);
        assert_eq!(gp.bindings.confirm, vec![Btn::Start]);
        assert_eq!(gp.bindings.cancel, vec![Btn::Start]);
    }

    #[test]
    fn press_is_an_edge_until_next_update() {
        let mut gp = GamepadState::new();
        gp.press(Btn::A);
        assert!(gp.spawn_echo_pressed());
        gp.press(Btn::A);
        gp.update();
        assert!(!gp.spawn_echo_pressed());
        assert!(gp.held.contains(&Btn::A));
    }

    #[test]
    fn stick_beats_dpad_and_is_clamped() {
        let mut gp = GamepadState::new();
        gp.held.insert(Btn::Left);
        assert_eq!(gp.intent(), MoveIntent { x: -1.0, y: 0.0 });

        gp.stick = (0.5, 0.0);
        assert_eq!(gp.intent(), MoveIntent { x: 0.5, y: 0.0 });

        gp.stick = (0.0, 1.0);
        assert_eq!(gp.intent(), MoveIntent { x: 0.0, y: -1.0 });

        gp.stick = (0.1, 0.1);
        assert_eq!(gp.intent(), MoveIntent { x: -1.0, y: 0.0 });
    }
}
