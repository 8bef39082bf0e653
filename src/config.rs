/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimTuning,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

/// Simulation constants. Distances are in world units (pixels),
/// radii are fractions of a tile, times are milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct SimTuning {
    pub tile_size: f32,
    pub player_speed: f32,       // world units per second
    pub record_window_ms: f64,
    pub min_echo_samples: usize,
    pub echo_grace_ms: f64,
    pub contact_radius: f32,     // crate push reach, in tiles
    pub trigger_radius: f32,     // switch reach, in tiles
    pub echo_switch_latch: bool, // let echo presses survive to the door check
    pub frame_ms: u64,
}

impl SimTuning {
    /// Recorder ring capacity: enough slots for one window at the frame rate,
    /// doubled so a slow frame never evicts a sample the window still wants.
    pub fn recorder_capacity(&self) -> usize {
        let per_window = self.record_window_ms / self.frame_ms.max(1) as f64;
        (per_window.ceil() as usize * 2).max(self.min_echo_samples)
    }
}

impl Default for SimTuning {
    fn default() -> Self {
        TomlSim::default().into()
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub spawn_echo: Vec<String>,
    pub restart: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    sim: TomlSim,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSim {
    #[serde(default = "default_tile_size")]
    tile_size: f32,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_record_window")]
    record_window_ms: f64,
    #[serde(default = "default_min_samples")]
    min_echo_samples: usize,
    #[serde(default = "default_echo_grace")]
    echo_grace_ms: f64,
    #[serde(default = "default_contact_radius")]
    contact_radius: f32,
    #[serde(default = "default_trigger_radius")]
    trigger_radius: f32,
    #[serde(default)]
    echo_switch_latch: bool,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_spawn_echo")]
    spawn_echo: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    log_file: Option<String>,
}

// ── Defaults ──

fn default_tile_size() -> f32 { 32.0 }
fn default_player_speed() -> f32 { 96.0 }   // 3 tiles per second
fn default_record_window() -> f64 { 3000.0 }
fn default_min_samples() -> usize { 5 }
fn default_echo_grace() -> f64 { 50.0 }
fn default_contact_radius() -> f32 { 0.5 }
fn default_trigger_radius() -> f32 { 0.45 }
fn default_frame_ms() -> u64 { 16 }

fn default_spawn_echo() -> Vec<String> { vec!["A".into(), "X".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlSim {
    fn default() -> Self {
        TomlSim {
            tile_size: default_tile_size(),
            player_speed: default_player_speed(),
            record_window_ms: default_record_window(),
            min_echo_samples: default_min_samples(),
            echo_grace_ms: default_echo_grace(),
            contact_radius: default_contact_radius(),
            trigger_radius: default_trigger_radius(),
            echo_switch_latch: false,
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            spawn_echo: default_spawn_echo(),
            restart: default_restart(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: None,
        }
    }
}

impl From<TomlSim> for SimTuning {
    fn from(t: TomlSim) -> Self {
        SimTuning {
            // A non-positive tile would make every cell lookup divide by zero.
            tile_size: if t.tile_size > 0.0 { t.tile_size } else { default_tile_size() },
            player_speed: t.player_speed.max(0.0),
            record_window_ms: t.record_window_ms.max(0.0),
            min_echo_samples: t.min_echo_samples.max(2),
            echo_grace_ms: t.echo_grace_ms.max(0.0),
            contact_radius: t.contact_radius.max(0.0),
            trigger_radius: t.trigger_radius.max(0.0),
            echo_switch_latch: t.echo_switch_latch,
            frame_ms: t.frame_ms.max(1),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (no filesystem search for the file itself).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(cfg, &candidate_dirs()))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if Path::new(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            sim: toml_cfg.sim.into(),
            gamepad: GamepadConfig {
                spawn_echo: toml_cfg.gamepad.spawn_echo,
                restart: toml_cfg.gamepad.restart,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            levels_dir,
            log_file: toml_cfg.general.log_file.map(PathBuf::from),
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn read_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str::<TomlConfig>(&text)?)
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match read_toml(&path) {
            Ok(cfg) => return cfg,
            Err(e @ ConfigError::Parse(_)) => {
                warn!(error = %e, "using default settings");
                return TomlConfig::default();
            }
            Err(e) => warn!(error = %e, "skipping unreadable config"),
        }
    }
    TomlConfig::default()
}
