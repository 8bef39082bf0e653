/// WorldState: the complete state of the running level.
///
/// One owned struct holds everything a tick touches (player, echoes,
/// crates, switches, door, static board). Every system receives it by
/// `&mut` from the step function; nothing lives in globals.
///
/// ## Layers
///
///   - `board`: static walls, never mutated after `load_level`
///   - entities: player, echoes, crates, switches, door
///   - `initial`: the level definition, kept so restart can rebuild
///     entities without touching disk

use crate::config::SimTuning;
use crate::domain::entity::{Crate, Door, Echo, Player, Switch};
use crate::domain::geom::{GridCell, Vec2};
use crate::domain::physics::Board;
use crate::domain::recorder::Recorder;
use crate::sim::level::LevelDef;
use crate::sim::view::{EchoView, FrameView, SwitchView};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    GameComplete,
}

pub struct WorldState {
    // ── Static geometry ──
    pub board: Board,

    // ── Entities ──
    pub player: Player,
    pub echoes: Vec<Echo>,
    pub crates: Vec<Crate>,
    pub switches: Vec<Switch>,
    pub door: Door,

    // ── Clock ──
    /// Absolute simulation time in ms since level (re)start.
    pub clock_ms: f64,
    pub tick: u64,
    pub next_echo_id: u32,

    // ── Level tracking ──
    pub solved: bool,
    pub initial: Option<LevelDef>,
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub level_text: String,

    // ── Tuning ──
    pub tuning: SimTuning,

    // ── Meta ──
    pub phase: Phase,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

impl WorldState {
    pub fn new(tuning: SimTuning) -> Self {
        let recording = Recorder::new(tuning.record_window_ms, tuning.recorder_capacity());
        WorldState {
            board: Board::default(),
            player: Player::new(Vec2::ZERO, recording),
            echoes: vec![],
            crates: vec![],
            switches: vec![],
            door: Door::new(GridCell::new(-1, -1), false),
            clock_ms: 0.0,
            tick: 0,
            next_echo_id: 1,
            solved: false,
            initial: None,
            current_level: 0,
            total_levels: 0,
            level_name: String::new(),
            level_text: String::new(),
            tuning,
            phase: Phase::Title,
            message: String::new(),
            message_timer: 0,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn player_cell(&self) -> GridCell {
        GridCell::of(self.player.pos, self.tuning.tile_size)
    }

    /// Rebuild every entity from a level definition. Echoes are dropped,
    /// the clock and recording restart, the door returns to its initial
    /// state.
    pub fn reset_from(&mut self, def: &LevelDef) {
        let tile = self.tuning.tile_size;
        self.board = Board::with_walls(def.width, def.height, &def.walls);
        self.player = Player::new(
            def.player.center(tile),
            Recorder::new(self.tuning.record_window_ms, self.tuning.recorder_capacity()),
        );
        self.echoes.clear();
        self.crates = def.crates.iter().map(|&c| Crate::new(c)).collect();
        self.switches = def.switches.iter()
            .map(|(cell, id)| Switch::new(id.clone(), *cell))
            .collect();
        self.door = Door::new(def.door.0, def.door.1);
        self.clock_ms = 0.0;
        self.tick = 0;
        self.next_echo_id = 1;
        self.solved = false;
        self.level_name = def.name.clone();
        self.level_text = def.text.clone();
    }

    /// Read-only snapshot for the renderer and UI.
    pub fn view(&self) -> FrameView {
        FrameView {
            player: self.player.pos,
            player_cell: self.player_cell(),
            echoes: self.echoes.iter()
                .filter(|e| e.is_alive())
                .map(|e| EchoView {
                    pos: e.pos,
                    cell: GridCell::of(e.pos, self.tuning.tile_size),
                    age_ms: e.age_ms,
                    remaining_ms: (e.timeline.duration() - e.age_ms).max(0.0),
                })
                .collect(),
            crates: self.crates.iter().map(|c| c.cell).collect(),
            switches: self.switches.iter()
                .map(|s| SwitchView { id: s.id.clone(), cell: s.cell, active: s.is_active() })
                .collect(),
            door: self.door.cell,
            door_open: self.door.open,
            solved: self.solved,
            recorded_samples: self.player.recording.len(),
        }
    }
}
