/// The step function: advances the world by one tick of `dt` milliseconds.
///
/// Processing order:
///   1. Restart / spawn-echo actions
///   2. Player movement (collision + push resolution)
///   3. Record the player's position at the new clock
///   4. Echo playback (may push crates, may press switches)
///   5. Drop expired echoes
///   6. Switch recompute (player reach + crate occupancy)
///   7. Door / solved check
///
/// The caller owns the cadence: one call per display frame, no
/// self-scheduling. The simulation keeps running after the level is
/// solved; progression is the front-end's decision.

use tracing::{debug, info};

use crate::domain::entity::{Echo, FrameInput, TriggerSource};
use crate::domain::physics::{self, Arena, MoveOutcome};
use crate::domain::playback;
use crate::domain::rules::{self, SwitchPass};
use super::event::GameEvent;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn advance(world: &mut WorldState, input: FrameInput, dt_ms: f64) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    if input.restart {
        restart_level(world);
        events.push(GameEvent::LevelRestarted);
        return events;
    }

    let dt_ms = dt_ms.max(0.0);
    let was_active: Vec<bool> = world.switches.iter().map(|s| s.is_active()).collect();

    if input.spawn_echo {
        resolve_spawn(world, &mut events);
    }

    world.clock_ms += dt_ms;
    resolve_player_movement(world, input, dt_ms, &mut events);
    world.player.recording.record(world.player.pos, world.clock_ms);

    let pass = SwitchPass::for_tuning(&world.tuning);
    if pass == SwitchPass::KeepEcho {
        rules::clear_echo_sources(&mut world.switches);
    }
    resolve_echoes(world, dt_ms, &mut events);
    world.echoes.retain(Echo::is_alive);

    rules::recompute_switches(
        &mut world.switches,
        world.player.pos,
        &world.crates,
        &world.tuning,
        pass,
    );
    for (s, was) in world.switches.iter().zip(was_active) {
        if s.is_active() && !was {
            events.push(GameEvent::SwitchPressed { id: s.id.clone() });
        }
    }

    resolve_completion(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Echo spawn
// ══════════════════════════════════════════════════════════════

/// Snapshot the player's recording into a new echo.
/// Returns false (and changes nothing) when the recording is too short.
pub fn spawn_echo(world: &mut WorldState) -> bool {
    let rec = &world.player.recording;
    let Some(timeline) = rec.snapshot(world.tuning.min_echo_samples) else {
        debug!(samples = rec.len(), oldest_ms = ?rec.oldest(), "echo refused");
        return false;
    };
    let id = world.next_echo_id;
    world.next_echo_id += 1;
    debug!(id, samples = timeline.len(), duration_ms = timeline.duration(), "echo spawned");
    world.echoes.push(Echo::new(id, timeline));
    true
}

fn resolve_spawn(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if spawn_echo(world) {
        if let Some(e) = world.echoes.last() {
            events.push(GameEvent::EchoSpawned { id: e.id, duration_ms: e.timeline.duration() });
        }
    } else {
        events.push(GameEvent::EchoSpawnFailed { samples: world.player.recording.len() });
    }
}

// ══════════════════════════════════════════════════════════════
// Player movement
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, input: FrameInput, dt_ms: f64, events: &mut Vec<GameEvent>) {
    world.player.intent = input.intent;
    if input.intent.is_zero() { return; }

    let dist = world.tuning.player_speed * (dt_ms / 1000.0) as f32;
    let dx = input.intent.x * dist;
    let dy = input.intent.y * dist;
    let tile = world.tuning.tile_size;
    let reach = world.tuning.trigger_radius * tile;

    let mut arena = Arena {
        board: &world.board,
        door: &world.door,
        crates: &mut world.crates,
        switches: &mut world.switches,
        tile_size: tile,
    };
    match physics::attempt_move(&mut arena, &mut world.player.pos, dx, dy, Some((TriggerSource::Player, reach))) {
        MoveOutcome::Moved => {}
        MoveOutcome::Pushed(p) => {
            events.push(GameEvent::CratePushed { from: p.from, to: p.to, by_echo: false });
        }
        MoveOutcome::Blocked(b) => events.push(GameEvent::MoveBlocked(b)),
    }
}

// ══════════════════════════════════════════════════════════════
// Echo playback
// ══════════════════════════════════════════════════════════════

fn resolve_echoes(world: &mut WorldState, dt_ms: f64, events: &mut Vec<GameEvent>) {
    for echo in world.echoes.iter_mut() {
        let out = playback::advance_echo(
            echo,
            dt_ms,
            &world.board,
            &world.door,
            &mut world.crates,
            &mut world.switches,
            &world.tuning,
        );
        for p in out.pushes {
            events.push(GameEvent::CratePushed { from: p.from, to: p.to, by_echo: true });
        }
        if out.expired {
            debug!(id = echo.id, age_ms = echo.age_ms, "echo expired");
            events.push(GameEvent::EchoExpired { id: echo.id });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Door / solved
// ══════════════════════════════════════════════════════════════

fn resolve_completion(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let cell = world.player_cell();
    let c = rules::evaluate_completion(&world.switches, &mut world.door, cell);

    if c.door_opened {
        info!(level = world.current_level + 1, tick = world.tick, "door opened");
        events.push(GameEvent::DoorOpened);
    }
    if c.solved && !world.solved {
        world.solved = true;
        info!(level = world.current_level + 1, clock_ms = world.clock_ms, "level solved");
        events.push(GameEvent::LevelSolved);
        world.set_message("Solved! Press Enter", 0);
    }
}

// ══════════════════════════════════════════════════════════════
// Restart
// ══════════════════════════════════════════════════════════════

/// Rebuild the current level from its definition. Echoes are discarded.
pub fn restart_level(world: &mut WorldState) {
    let Some(def) = world.initial.clone() else { return };
    world.reset_from(&def);
    info!(level = world.current_level + 1, name = %def.name, "level restarted");
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
