/// Switch aggregation and level completion.
///
/// Pure functions over the level's switches, crates and door; the step
/// function decides when to call them.
///
/// ## Per-tick switch sequencing
///
///   (i)   echo playback runs and may set `by_echo`
///   (ii)  every source on every switch is cleared
///   (iii) player reach and crate occupancy are evaluated fresh
///
/// With this order an echo's proximity press is visible only inside the
/// echo pass. Crates an echo pushed onto a switch still count, because
/// (iii) finds them again. `SwitchPass::KeepEcho` moves the clear of the
/// echo source to before (i) instead, so echo presses survive to the
/// door check.
///
/// ## Completion
///
///   every switch active      → door opens (never closes again)
///   door open && player cell == door cell → solved

use crate::config::SimTuning;
use super::entity::{Crate, Door, Switch, TriggerSource};
use super::geom::{GridCell, Vec2};
use super::physics;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SwitchPass {
    /// Clear all three sources before the fresh pass.
    ClearAll,
    /// Leave `by_echo` as the echo pass set it.
    KeepEcho,
}

impl SwitchPass {
    pub fn for_tuning(tuning: &SimTuning) -> Self {
        if tuning.echo_switch_latch { SwitchPass::KeepEcho } else { SwitchPass::ClearAll }
    }
}

/// Drop every echo press. Used before the echo pass in `KeepEcho` mode.
pub fn clear_echo_sources(switches: &mut [Switch]) {
    for s in switches {
        s.sources.by_echo = false;
    }
}

/// Steps (ii) and (iii): reset, then re-press from the player and crates.
pub fn recompute_switches(
    switches: &mut [Switch],
    player_pos: Vec2,
    crates: &[Crate],
    tuning: &SimTuning,
    pass: SwitchPass,
) {
    for s in switches.iter_mut() {
        match pass {
            SwitchPass::ClearAll => s.reset(),
            SwitchPass::KeepEcho => {
                s.sources.by_player = false;
                s.sources.by_crate = false;
            }
        }
    }

    let tile = tuning.tile_size;
    physics::press_nearby(switches, player_pos, tuning.trigger_radius * tile, tile, TriggerSource::Player);

    for s in switches.iter_mut() {
        if physics::crate_at(crates, s.cell).is_some() {
            s.press(TriggerSource::Crate);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Completion {
    /// The door went from closed to open on this evaluation.
    pub door_opened: bool,
    pub solved: bool,
}

pub fn evaluate_completion(switches: &[Switch], door: &mut Door, player_cell: GridCell) -> Completion {
    let mut out = Completion::default();
    if switches.iter().all(Switch::is_active) {
        out.door_opened = door.open();
    }
    out.solved = door.open && player_cell == door.cell;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 32.0;

    fn tuning() -> SimTuning {
        SimTuning::default()
    }

    #[test]
    fn echo_press_cleared_by_recompute() {
        let mut switches = vec![Switch::new("S1", GridCell::new(9, 6))];
        switches[0].press(TriggerSource::Echo);
        assert!(switches[0].is_active());
        let far = GridCell::new(1, 6).center(TILE);
        recompute_switches(&mut switches, far, &[], &tuning(), SwitchPass::ClearAll);
        assert!(!switches[0].is_active());
    }

    #[test]
    fn keep_echo_pass_preserves_echo_press() {
        let mut switches = vec![Switch::new("S1", GridCell::new(9, 6))];
        switches[0].press(TriggerSource::Echo);
        switches[0].press(TriggerSource::Player);
        let far = GridCell::new(1, 6).center(TILE);
        recompute_switches(&mut switches, far, &[], &tuning(), SwitchPass::KeepEcho);
        assert!(switches[0].sources.by_echo);
        assert!(!switches[0].sources.by_player);
        clear_echo_sources(&mut switches);
        assert!(!switches[0].is_active());
    }

    #[test]
    fn player_and_crate_sources_recomputed() {
        let mut switches = vec![
            Switch::new("S1", GridCell::new(2, 2)),
            Switch::new("S2", GridCell::new(5, 5)),
        ];
        let crates = vec![Crate::new(GridCell::new(5, 5))];
        let on_s1 = GridCell::new(2, 2).center(TILE);
        recompute_switches(&mut switches, on_s1, &crates, &tuning(), SwitchPass::ClearAll);
        assert!(switches[0].sources.by_player);
        assert!(switches[1].sources.by_crate);
        assert!(!switches[1].sources.by_player);
    }

    #[test]
    fn player_at_edge_of_cell_does_not_press() {
        let mut switches = vec![Switch::new("S1", GridCell::new(2, 2))];
        // Same cell, but 15 units from the center (> 0.45 tile).
        let pos = GridCell::new(2, 2).center(TILE) + Vec2::new(15.0, 0.0);
        recompute_switches(&mut switches, pos, &[], &tuning(), SwitchPass::ClearAll);
        assert!(!switches[0].is_active());
    }

    #[test]
    fn door_opens_when_all_switches_active() {
        let mut switches = vec![
            Switch::new("S1", GridCell::new(1, 1)),
            Switch::new("S2", GridCell::new(2, 1)),
        ];
        let mut door = Door::new(GridCell::new(5, 1), false);
        switches[0].press(TriggerSource::Player);
        let c = evaluate_completion(&switches, &mut door, GridCell::new(0, 0));
        assert!(!c.door_opened && !door.open);

        switches[1].press(TriggerSource::Crate);
        let c = evaluate_completion(&switches, &mut door, GridCell::new(0, 0));
        assert!(c.door_opened && door.open);
        assert!(!c.solved);
    }

    #[test]
    fn door_stays_open_when_switches_release() {
        let mut switches = vec![Switch::new("S1", GridCell::new(1, 1))];
        let mut door = Door::new(GridCell::new(5, 1), false);
        switches[0].press(TriggerSource::Player);
        evaluate_completion(&switches, &mut door, GridCell::new(0, 0));
        switches[0].reset();
        for _ in 0..5 {
            let c = evaluate_completion(&switches, &mut door, GridCell::new(0, 0));
            assert!(!c.door_opened);
            assert!(door.open);
        }
    }

    #[test]
    fn solved_only_on_open_door_cell() {
        let switches: Vec<Switch> = vec![Switch::new("S1", GridCell::new(1, 1))];
        let mut door = Door::new(GridCell::new(5, 1), false);
        let c = evaluate_completion(&switches, &mut door, GridCell::new(5, 1));
        assert!(!c.solved);

        let mut open = Door::new(GridCell::new(5, 1), true);
        let c = evaluate_completion(&switches, &mut open, GridCell::new(5, 1));
        assert!(c.solved);
        assert!(!c.door_opened);
        let c = evaluate_completion(&switches, &mut open, GridCell::new(4, 1));
        assert!(!c.solved);
    }

    #[test]
    fn no_switches_means_door_opens() {
        let mut door = Door::new(GridCell::new(3, 3), false);
        let c = evaluate_completion(&[], &mut door, GridCell::new(0, 0));
        assert!(c.door_opened);
    }
}
