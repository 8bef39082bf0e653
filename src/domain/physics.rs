/// Grid collision resolver: the single answer to "may this move happen".
///
/// ## Architecture
///
/// Two distinct concepts, queried separately:
///   1. TERRAIN:   what the cell IS (wall/floor from `Board`, plus the door)
///   2. OCCUPANCY: what is IN the cell (crates)
///
/// A move is resolved against the cell containing the *target position*:
///
/// ┌──────────────────────────────┬──────────────────────────────┐
/// │ Target cell                   │ Result                       │
/// ├──────────────────────────────┼──────────────────────────────┤
/// │ Wall / out of range           │ Blocked(Wall), no change     │
/// │ Closed door                   │ Blocked(Door), no change     │
/// │ Crate, push succeeds          │ Pushed, position committed   │
/// │ Crate, push fails             │ Blocked(Crate), no slide     │
/// │ Otherwise                     │ Moved, position committed    │
/// └──────────────────────────────┴──────────────────────────────┘
///
/// Pushing moves a crate exactly one cell along one axis. It fails on
/// walls, out-of-range cells, a closed door and other crates; there are
/// no chains.

use super::entity::{Crate, Door, Switch, TriggerSource};
use super::geom::{dominant_axis, GridCell, Step, Vec2};
use super::tile::Tile;

/// Static level geometry. Cells outside `width × height` are walls.
#[derive(Clone, Debug, Default)]
pub struct Board {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Vec<Tile>>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Board { width, height, tiles: vec![vec![Tile::Floor; width]; height] }
    }

    pub fn with_walls(width: usize, height: usize, walls: &[GridCell]) -> Self {
        let mut board = Board::new(width, height);
        for &w in walls {
            if board.in_bounds(w) {
                board.tiles[w.row as usize][w.col as usize] = Tile::Wall;
            }
        }
        board
    }

    #[inline]
    pub fn in_bounds(&self, cell: GridCell) -> bool {
        cell.col >= 0 && cell.row >= 0
            && (cell.col as usize) < self.width
            && (cell.row as usize) < self.height
    }

    /// Terrain at `cell`; out of range = wall.
    #[inline]
    pub fn terrain_at(&self, cell: GridCell) -> Tile {
        if self.in_bounds(cell) {
            self.tiles[cell.row as usize][cell.col as usize]
        } else {
            Tile::Wall
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Blocker {
    Wall,
    Door,
    Crate,
}

/// A completed one-cell crate push.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Push {
    pub crate_idx: usize,
    pub from: GridCell,
    pub to: GridCell,
    /// Index of the switch the crate landed on, if any.
    pub landed_on: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    Moved,
    Pushed(Push),
    Blocked(Blocker),
}

/// Everything a move may touch in one tick.
pub struct Arena<'a> {
    pub board: &'a Board,
    pub door: &'a Door,
    pub crates: &'a mut [Crate],
    pub switches: &'a mut [Switch],
    pub tile_size: f32,
}

// ══════════════════════════════════════════════════════════════
// Occupancy
// ══════════════════════════════════════════════════════════════

pub fn crate_at(crates: &[Crate], cell: GridCell) -> Option<usize> {
    crates.iter().position(|c| c.cell == cell)
}

/// Press every switch whose center lies within `radius` world units of `pos`.
/// Returns the indices pressed.
pub fn press_nearby(switches: &mut [Switch], pos: Vec2, radius: f32, tile_size: f32, source: TriggerSource) -> Vec<usize> {
    let mut pressed = vec![];
    for (i, s) in switches.iter_mut().enumerate() {
        if s.cell.center(tile_size).distance(pos) <= radius {
            s.press(source);
            pressed.push(i);
        }
    }
    pressed
}

// ══════════════════════════════════════════════════════════════
// Push rule
// ══════════════════════════════════════════════════════════════

/// Try to move crate `idx` one cell by `step`.
pub fn attempt_push(
    board: &Board,
    door: &Door,
    crates: &mut [Crate],
    switches: &mut [Switch],
    idx: usize,
    step: Step,
) -> Option<Push> {
    let from = crates.get(idx)?.cell;
    let to = from.offset(step);

    if board.terrain_at(to).is_solid() { return None; }
    if to == door.cell && !door.open { return None; }
    if crate_at(crates, to).is_some() { return None; }

    crates[idx].cell = to;

    let landed_on = switches.iter().position(|s| s.cell == to);
    if let Some(si) = landed_on {
        switches[si].press(TriggerSource::Crate);
    }

    Some(Push { crate_idx: idx, from, to, landed_on })
}

// ══════════════════════════════════════════════════════════════
// Move rule
// ══════════════════════════════════════════════════════════════

/// Resolve a proposed displacement for a collidable body at `pos`.
/// On success `pos` becomes the target; on rejection it is untouched.
///
/// `presser` names who presses switches after a successful move
/// (the live player); `None` for bodies that never trigger.
pub fn attempt_move(
    arena: &mut Arena<'_>,
    pos: &mut Vec2,
    dx: f32,
    dy: f32,
    presser: Option<(TriggerSource, f32)>,
) -> MoveOutcome {
    let target = Vec2::new(pos.x + dx, pos.y + dy);
    let cell = GridCell::of(target, arena.tile_size);

    if arena.board.terrain_at(cell).is_solid() {
        return MoveOutcome::Blocked(Blocker::Wall);
    }
    if cell == arena.door.cell && !arena.door.open {
        return MoveOutcome::Blocked(Blocker::Door);
    }

    let mut outcome = MoveOutcome::Moved;
    if let Some(idx) = crate_at(arena.crates, cell) {
        let step = match dominant_axis(dx, dy) {
            Some(s) => s,
            None => return MoveOutcome::Blocked(Blocker::Crate),
        };
        match attempt_push(arena.board, arena.door, arena.crates, arena.switches, idx, step) {
            Some(push) => outcome = MoveOutcome::Pushed(push),
            None => return MoveOutcome::Blocked(Blocker::Crate),
        }
    }

    *pos = target;

    if let Some((source, radius)) = presser {
        press_nearby(arena.switches, *pos, radius, arena.tile_size, source);
    }

    outcome
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
