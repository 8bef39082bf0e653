/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::level::{load_level, load_levels, LevelDef};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, KEYS_CONFIRM, KEYS_ECHO, KEYS_QUIT, KEYS_RESTART};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(2);
/// Longest tick fed to the simulation; a stalled terminal must not teleport echoes.
const MAX_DT_MS: f64 = 100.0;

fn main() {
    let config = GameConfig::load();
    init_tracing(config.log_file.as_deref());

    let levels = load_levels(&config);
    info!(levels = levels.len(), latch = config.sim.echo_switch_latch, "starting");

    let mut world = WorldState::new(config.sim.clone());
    world.total_levels = levels.len();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    if sound.is_none() {
        warn!("no audio output; running silent");
    }

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &levels, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    info!(level = world.current_level + 1, "exiting");
    println!("Thanks for playing Echotrail!");
}

/// File-only subscriber: the terminal belongs to the renderer.
fn init_tracing(log_file: Option<&Path>) {
    let Some(path) = log_file else { return };
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", path.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    levels: &[LevelDef],
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.reports_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    info!(key_release = kb.honor_release, gamepad = gp.connected, "input ready");
    let frame = Duration::from_millis(config.sim.frame_ms);
    let mut last_tick = Instant::now();

    // Edge-triggered actions wait here until the next tick consumes them.
    let mut pending_spawn = false;
    let mut pending_restart = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp, levels) {
            break;
        }

        if world.phase == Phase::Playing {
            pending_spawn |= kb.any_pressed(KEYS_ECHO) || gp.spawn_echo_pressed();
            pending_restart |= kb.any_pressed(KEYS_RESTART) || gp.restart_pressed();
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= frame {
            last_tick = Instant::now();
            if world.phase == Phase::Playing {
                let kb_intent = kb.intent();
                let input = FrameInput {
                    intent: if kb_intent.is_zero() { gp.intent() } else { kb_intent },
                    spawn_echo: std::mem::take(&mut pending_spawn),
                    restart: std::mem::take(&mut pending_restart),
                };
                let dt_ms = (elapsed.as_secs_f64() * 1000.0).min(MAX_DT_MS);
                let events = step::advance(world, input, dt_ms);
                react_to_events(world, sound, &events);
            }
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Sound and banner feedback. The simulation itself never reports rejections.
fn react_to_events(world: &mut WorldState, sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::EchoSpawned { .. } => {
                if let Some(s) = sound { s.play_echo(); }
            }
            GameEvent::EchoSpawnFailed { .. } => {
                if let Some(s) = sound { s.play_fizzle(); }
                world.set_message("Move a little first: nothing to replay yet", 60);
            }
            GameEvent::CratePushed { .. } => {
                if let Some(s) = sound { s.play_push(); }
            }
            GameEvent::SwitchPressed { .. } => {
                if let Some(s) = sound { s.play_switch(); }
            }
            GameEvent::DoorOpened => {
                if let Some(s) = sound { s.play_door(); }
                if !world.solved {
                    world.set_message("The door is open", 60);
                }
            }
            GameEvent::LevelSolved => {
                if let Some(s) = sound { s.play_solved(); }
            }
            GameEvent::LevelRestarted => world.set_message("Restarted", 30),
            GameEvent::EchoExpired { .. } | GameEvent::MoveBlocked(_) => {}
        }
    }
}

/// Phase transitions driven by confirm / quit. Returns true to exit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState, levels: &[LevelDef]) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let quit = kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed();

    match world.phase {
        Phase::Title => {
            if quit {
                return true;
            }
            if confirm {
                load_level(world, 0, levels);
            }
        }
        Phase::Playing => {
            if quit {
                return true;
            }
            if confirm && world.solved {
                load_level(world, world.current_level + 1, levels);
            }
        }
        Phase::GameComplete => {
            if confirm || quit {
                let tuning = world.tuning.clone();
                *world = WorldState::new(tuning);
                world.total_levels = levels.len();
            }
        }
    }

    false
}
