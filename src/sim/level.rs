/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   ```text
///   # Level Name
///   > Description line shown in the banner.
///   > More description.
///   ####################
///   #P.......S.........D
///   ####################
///   ```
///
/// The `# ` header and `> ` lines must come before the first map row.
///
/// ## Tile legend:
///   '#' = Wall                   '.' / ' ' = Floor
///   'P' = Player spawn           'B' = Crate
///   'S' = Switch (S1, S2, ... in reading order)
///   '*' = Crate resting on a switch
///   'D' = Door (closed)          'O' = Door (open)

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::domain::geom::GridCell;
use crate::sim::world::{Phase, WorldState};

/// A level as the core consumes it. Storage format is this module's concern.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelDef {
    pub name: String,
    pub text: String,
    pub width: usize,
    pub height: usize,
    pub player: GridCell,
    pub crates: Vec<GridCell>,
    pub switches: Vec<(GridCell, String)>,
    pub door: (GridCell, bool),
    pub walls: Vec<GridCell>,
}

#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("level has no map rows")]
    EmptyMap,
    #[error("level has no player spawn")]
    MissingPlayer,
    #[error("second player spawn at ({col}, {row})")]
    DuplicatePlayer { col: i32, row: i32 },
    #[error("level has no door")]
    MissingDoor,
    #[error("second door at ({col}, {row})")]
    DuplicateDoor { col: i32, row: i32 },
    #[error("unknown tile {ch:?} at ({col}, {row})")]
    UnknownTile { ch: char, col: i32, row: i32 },
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Levels from the configured directory, or the built-in set.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let mut found = load_from_directory(dir);
        if !found.is_empty() {
            found.sort_by(|a, b| a.0.cmp(&b.0));
            info!(dir = %dir.display(), count = found.len(), "loaded level directory");
            return found.into_iter().map(|(_, def)| def).collect();
        }
    }
    embedded_levels()
}

/// Load level `idx` into the world. Past the last level → game complete.
pub fn load_level(world: &mut WorldState, idx: usize, levels: &[LevelDef]) {
    world.total_levels = levels.len();
    let Some(def) = levels.get(idx) else {
        world.phase = Phase::GameComplete;
        return;
    };

    world.current_level = idx;
    world.reset_from(def);
    world.initial = Some(def.clone());
    world.phase = Phase::Playing;
    world.set_message(&def.name, 120);

    info!(
        level = idx + 1,
        name = %def.name,
        crates = def.crates.len(),
        switches = def.switches.len(),
        "level loaded"
    );
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

/// Every character a map row may contain.
const LEGEND: &str = "#. PBSDO*";

fn is_map_row(line: &str) -> bool {
    line.chars().all(|c| LEGEND.contains(c))
}

pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut text_lines: Vec<&str> = vec![];
    let mut rows: Vec<&str> = vec![];

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if rows.is_empty() {
            // `# Name` only while no name is set; `# ..#` is a wall row.
            if name.is_empty() && !is_map_row(line) {
                if let Some(rest) = line.strip_prefix("# ") {
                    name = rest.trim().to_string();
                    continue;
                }
            }
            if let Some(rest) = line.strip_prefix('>') {
                text_lines.push(rest.trim());
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
        }
        rows.push(line);
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::EmptyMap);
    }

    let height = rows.len();
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);

    let mut player = None;
    let mut door = None;
    let mut crates = vec![];
    let mut switches = vec![];
    let mut walls = vec![];

    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let cell = GridCell::new(x as i32, y as i32);
            match ch {
                '#' => walls.push(cell),
                '.' | ' ' => {}
                'P' => {
                    if player.replace(cell).is_some() {
                        return Err(LevelError::DuplicatePlayer { col: cell.col, row: cell.row });
                    }
                }
                'B' => crates.push(cell),
                'S' => switches.push((cell, format!("S{}", switches.len() + 1))),
                '*' => {
                    crates.push(cell);
                    switches.push((cell, format!("S{}", switches.len() + 1)));
                }
                'D' | 'O' => {
                    if door.replace((cell, ch == 'O')).is_some() {
                        return Err(LevelError::DuplicateDoor { col: cell.col, row: cell.row });
                    }
                }
                other => {
                    return Err(LevelError::UnknownTile { ch: other, col: cell.col, row: cell.row });
                }
            }
        }
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    Ok(LevelDef {
        name,
        text: text_lines.join(" "),
        width,
        height,
        player: player.ok_or(LevelError::MissingPlayer)?,
        crates,
        switches,
        door: door.ok_or(LevelError::MissingDoor)?,
        walls,
    })
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read level directory");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable level");
                    continue;
                }
            };
            match parse_level(&content) {
                Ok(def) => {
                    let filename = path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    results.push((filename, def));
                }
                Err(e) => warn!(file = %path.display(), error = %e, "skipping bad level"),
            }
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: &[&str] = &[
"# First Echo
> Walk around, then press E: an echo replays your last three seconds.
> Stand on the switch to open the door.
####################
#..................#
#..................#
#..................#
#..................#
#..................#
#P.......S.........D
#..................#
#..................#
#..................#
#..................#
#..................#
####################",
"# Heavy Lifting
> Crates move one tile per push. A crate resting on a switch holds it down.
####################
#..................#
#..................#
#..................#
#..................#
#..................#
#P......B...S......D
#..................#
#..................#
#..................#
#..................#
#..................#
####################",
"# Past Hands
> Two switches, one of you. Let an echo walk a crate home while you hold the other.
####################
#..................#
#..####....####....#
#..#S.#....#..#....#
#..#..#....#..#....#
#..#..#....#B.#....#
#P.....B.......S...D
#..................#
#..####....#######.#
#..................#
#..................#
#..................#
####################",
"# Narrow Hall
> Walls do not stop echoes, but they stop crates.
####################
####################
####################
#.......S#.........#
#.######.#.#######.#
#.#....#.#.#.....#.#
#P..B....B.......*.D
#.#....#.#.#.....#.#
#.######.#.#######.#
#........#.........#
####################
####################
####################",
];

fn embedded_levels() -> Vec<LevelDef> {
    EMBEDDED.iter()
        .filter_map(|src| match parse_level(src) {
            Ok(def) => Some(def),
            Err(e) => {
                warn!(error = %e, "built-in level rejected");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimTuning;

    #[test]
    fn parses_header_text_and_entities() {
        let def = parse_level("# Tiny\n> Hello\n> there\n#####\n#PBS#\n#..O#\n#####\n").unwrap();
        assert_eq!(def.name, "Tiny");
        assert_eq!(def.text, "Hello there");
        assert_eq!((def.width, def.height), (5, 4));
        assert_eq!(def.player, GridCell::new(1, 1));
        assert_eq!(def.crates, vec![GridCell::new(2, 1)]);
        assert_eq!(def.switches, vec![(GridCell::new(3, 1), "S1".to_string())]);
        assert_eq!(def.door, (GridCell::new(3, 2), true));
        assert_eq!(def.walls.len(), 5 + 2 + 2 + 5);
    }

    #[test]
    fn wall_row_with_space_floor_is_not_a_header() {
        let def = parse_level("# ..#\n#P.D#\n").unwrap();
        assert_eq!(def.name, "Unnamed Level");
        assert_eq!(def.height, 2);
        assert_eq!(def.player, GridCell::new(1, 1));

        let def = parse_level("# Hall\n# ..#\n#P.D#\n").unwrap();
        assert_eq!(def.name, "Hall");
        assert_eq!(def.height, 2);
        assert!(def.walls.contains(&GridCell::new(0, 0)));
    }

    #[test]
    fn crate_on_switch_marker() {
        let def = parse_level("# x\nP*D\n").unwrap();
        assert_eq!(def.crates, vec![GridCell::new(1, 0)]);
        assert_eq!(def.switches, vec![(GridCell::new(1, 0), "S1".to_string())]);
    }

    #[test]
    fn ragged_rows_take_widest() {
        let def = parse_level("# r\nP.\n...D\n").unwrap();
        assert_eq!(def.width, 4);
    }

    #[test]
    fn missing_player_and_door_are_errors() {
        assert_eq!(parse_level("# a\n..D\n"), Err(LevelError::MissingPlayer));
        assert_eq!(parse_level("# a\nP..\n"), Err(LevelError::MissingDoor));
        assert_eq!(parse_level("# a\n> only text\n"), Err(LevelError::EmptyMap));
    }

    #[test]
    fn duplicates_and_unknown_tiles_are_errors() {
        assert_eq!(parse_level("# a\nPPD\n"), Err(LevelError::DuplicatePlayer { col: 1, row: 0 }));
        assert_eq!(parse_level("# a\nPDO\n"), Err(LevelError::DuplicateDoor { col: 2, row: 0 }));
        assert_eq!(parse_level("# a\nP?D\n"), Err(LevelError::UnknownTile { ch: '?', col: 1, row: 0 }));
    }

    #[test]
    fn embedded_levels_all_parse() {
        assert_eq!(embedded_levels().len(), EMBEDDED.len());
        for def in embedded_levels() {
            assert_eq!(def.width, 20);
            assert_eq!(def.height, 13);
        }
    }

    #[test]
    fn first_level_matches_layout() {
        let def = &embedded_levels()[0];
        assert_eq!(def.player, GridCell::new(1, 6));
        assert_eq!(def.switches[0].0, GridCell::new(9, 6));
        assert_eq!(def.door, (GridCell::new(19, 6), false));
    }

    #[test]
    fn load_past_end_completes_game() {
        let levels = embedded_levels();
        let mut world = WorldState::new(SimTuning::default());
        load_level(&mut world, 0, &levels);
        assert_eq!(world.phase, Phase::Playing);
        assert_eq!(world.total_levels, levels.len());
        load_level(&mut world, levels.len(), &levels);
        assert_eq!(world.phase, Phase::GameComplete);
    }
}
