/// Read-only frame snapshot handed to the renderer and UI each tick.
///
/// Built by `WorldState::view()`. Consumers only ever see copies, so the
/// simulation cannot be mutated from the presentation side.

use crate::domain::geom::{GridCell, Vec2};

#[derive(Clone, Debug, PartialEq)]
pub struct EchoView {
    pub pos: Vec2,
    pub cell: GridCell,
    pub age_ms: f64,
    pub remaining_ms: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchView {
    pub id: String,
    pub cell: GridCell,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameView {
    pub player: Vec2,
    pub player_cell: GridCell,
    pub echoes: Vec<EchoView>,
    pub crates: Vec<GridCell>,
    pub switches: Vec<SwitchView>,
    pub door: GridCell,
    pub door_open: bool,
    pub solved: bool,
    pub recorded_samples: usize,
}

impl FrameView {
    pub fn switch_at(&self, cell: GridCell) -> Option<&SwitchView> {
        self.switches.iter().find(|s| s.cell == cell)
    }

    pub fn active_switches(&self) -> usize {
        self.switches.iter().filter(|s| s.active).count()
    }
}
