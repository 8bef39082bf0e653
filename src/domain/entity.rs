/// Entities: Player, Echo, Crate, Switch, Door.
/// Plus the per-tick input record the step function consumes.

use super::geom::{GridCell, Vec2};
use super::recorder::{Recorder, Timeline};

/// Who pressed a switch. Replaces "is this the player?" checks: every
/// trigger path names its source explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriggerSource {
    Player,
    Echo,
    Crate,
}

/// Normalised movement direction from the input layer.
/// Zero vector = no movement this tick.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct MoveIntent {
    pub x: f32,
    pub y: f32,
}

impl MoveIntent {
    /// Build from held directions. Opposite keys cancel; diagonals are
    /// normalised so combined keys are not faster than a single key.
    pub fn from_keys(up: bool, down: bool, left: bool, right: bool) -> Self {
        let x = (right as i32 - left as i32) as f32;
        let y = (down as i32 - up as i32) as f32;
        let len = (x * x + y * y).sqrt();
        if len == 0.0 {
            MoveIntent::default()
        } else {
            MoveIntent { x: x / len, y: y / len }
        }
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Frame input: held movement plus two edge-triggered actions.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub intent: MoveIntent,
    pub spawn_echo: bool,
    pub restart: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Vec2,
    pub intent: MoveIntent,
    pub recording: Recorder,
}

impl Player {
    pub fn new(pos: Vec2, recording: Recorder) -> Self {
        Player { pos, intent: MoveIntent::default(), recording }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EchoState {
    Playing,
    Expired, // terminal
}

/// A replay of a recorded timeline. Owns its timeline outright; the
/// player's live recording is never touched by an echo.
#[derive(Clone, Debug)]
pub struct Echo {
    pub id: u32,
    pub timeline: Timeline,
    pub age_ms: f64,
    pub pos: Vec2,
    pub state: EchoState,
    /// Index of the sample at or before the current playback time.
    /// Only moves forward because age only grows.
    pub cursor: usize,
}

impl Echo {
    pub fn new(id: u32, timeline: Timeline) -> Self {
        let pos = timeline.first().map(|s| s.pos).unwrap_or_default();
        Echo { id, timeline, age_ms: 0.0, pos, state: EchoState::Playing, cursor: 0 }
    }

    pub fn is_alive(&self) -> bool {
        self.state == EchoState::Playing
    }
}

/// A pushable crate. The cell is authoritative; the continuous
/// position is always derived from it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Crate {
    pub cell: GridCell,
}

impl Crate {
    pub fn new(cell: GridCell) -> Self {
        Crate { cell }
    }

    pub fn center(&self, tile_size: f32) -> Vec2 {
        self.cell.center(tile_size)
    }
}

/// Three independent activation sources; a switch is active if any is set.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Activation {
    pub by_player: bool,
    pub by_echo: bool,
    pub by_crate: bool,
}

#[derive(Clone, Debug)]
pub struct Switch {
    pub id: String,
    pub cell: GridCell,
    pub sources: Activation,
}

impl Switch {
    pub fn new(id: impl Into<String>, cell: GridCell) -> Self {
        Switch { id: id.into(), cell, sources: Activation::default() }
    }

    pub fn is_active(&self) -> bool {
        self.sources.by_player || self.sources.by_echo || self.sources.by_crate
    }

    pub fn press(&mut self, source: TriggerSource) {
        match source {
            TriggerSource::Player => self.sources.by_player = true,
            TriggerSource::Echo => self.sources.by_echo = true,
            TriggerSource::Crate => self.sources.by_crate = true,
        }
    }

    pub fn reset(&mut self) {
        self.sources = Activation::default();
    }
}

/// Exit door. `open` only ever goes false → true within one level instance.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Door {
    pub cell: GridCell,
    pub open: bool,
}

impl Door {
    pub fn new(cell: GridCell, open: bool) -> Self {
        Door { cell, open }
    }

    /// Open the door. Returns true only on the closed → open transition.
    pub fn open(&mut self) -> bool {
        let was_closed = !self.open;
        self.open = true;
        was_closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_sources_are_independent() {
        let mut s = Switch::new("S1", GridCell::new(3, 3));
        assert!(!s.is_active());
        s.press(TriggerSource::Echo);
        assert!(s.is_active());
        assert!(s.sources.by_echo);
        assert!(!s.sources.by_player && !s.sources.by_crate);
        s.press(TriggerSource::Crate);
        s.reset();
        assert!(!s.is_active());
        assert_eq!(s.sources, Activation::default());
    }

    #[test]
    fn door_open_reports_transition_once() {
        let mut d = Door::new(GridCell::new(19, 6), false);
        assert!(d.open());
        assert!(d.open);
        assert!(!d.open());
        assert!(d.open);
    }

    #[test]
    fn intent_normalises_diagonals() {
        let i = MoveIntent::from_keys(true, false, false, true);
        assert!((i.x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((i.y + std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(MoveIntent::from_keys(true, true, false, false).is_zero());
        assert_eq!(MoveIntent::from_keys(false, false, true, false), MoveIntent { x: -1.0, y: 0.0 });
    }

    #[test]
    fn crate_center_follows_cell() {
        let c = Crate::new(GridCell::new(8, 6));
        assert_eq!(c.center(32.0), Vec2::new(272.0, 208.0));
    }
}
