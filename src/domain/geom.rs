/// Continuous world positions and the discrete grid they snap to.
///
/// Movable things live in world units (pixel-equivalent). Occupancy, walls,
/// switches and doors live on the grid. `GridCell::of` is the only bridge
/// from the continuous side to the discrete side.

pub use glam::Vec2;

/// Integer (column, row). Signed: positions left of / above the map
/// resolve to negative cells, which the board treats as walls.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GridCell {
    pub col: i32,
    pub row: i32,
}

impl GridCell {
    pub fn new(col: i32, row: i32) -> Self {
        GridCell { col, row }
    }

    /// Floor-divide a position by the tile size.
    pub fn of(pos: Vec2, tile_size: f32) -> Self {
        GridCell {
            col: (pos.x / tile_size).floor() as i32,
            row: (pos.y / tile_size).floor() as i32,
        }
    }

    pub fn center(self, tile_size: f32) -> Vec2 {
        Vec2::new(
            (self.col as f32 + 0.5) * tile_size,
            (self.row as f32 + 0.5) * tile_size,
        )
    }

    pub fn offset(self, step: Step) -> Self {
        GridCell { col: self.col + step.dx, row: self.row + step.dy }
    }
}

/// A single orthogonal grid step. Never diagonal, never zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Step {
    pub dx: i32,
    pub dy: i32,
}

pub fn axis_sign(v: f32) -> i32 {
    if v > 0.0 { 1 } else if v < 0.0 { -1 } else { 0 }
}

/// Collapse a displacement to one grid step along its larger axis.
/// Ties go to the horizontal axis. `None` when there is no displacement.
pub fn dominant_axis(dx: f32, dy: f32) -> Option<Step> {
    let (sx, sy) = (axis_sign(dx), axis_sign(dy));
    if sx == 0 && sy == 0 {
        return None;
    }
    if dx.abs() >= dy.abs() {
        Some(Step { dx: sx, dy: 0 })
    } else {
        Some(Step { dx: 0, dy: sy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_floor_divides() {
        assert_eq!(GridCell::of(Vec2::new(48.0, 200.0), 32.0), GridCell::new(1, 6));
        assert_eq!(GridCell::of(Vec2::new(31.99, 0.0), 32.0), GridCell::new(0, 0));
        assert_eq!(GridCell::of(Vec2::new(-0.5, 5.0), 32.0), GridCell::new(-1, 0));
    }

    #[test]
    fn center_is_inside_cell() {
        let c = GridCell::new(9, 6);
        let p = c.center(32.0);
        assert_eq!(p, Vec2::new(304.0, 208.0));
        assert_eq!(GridCell::of(p, 32.0), c);
    }

    #[test]
    fn dominant_axis_drops_minor_component() {
        assert_eq!(dominant_axis(3.0, -1.0), Some(Step { dx: 1, dy: 0 }));
        assert_eq!(dominant_axis(-0.5, 2.0), Some(Step { dx: 0, dy: 1 }));
        assert_eq!(dominant_axis(0.0, -4.0), Some(Step { dx: 0, dy: -1 }));
        assert_eq!(dominant_axis(0.0, 0.0), None);
    }

    #[test]
    fn dominant_axis_tie_prefers_horizontal() {
        assert_eq!(dominant_axis(-2.0, 2.0), Some(Step { dx: -1, dy: 0 }));
    }

    #[test]
    fn lerp_endpoints() {
        let a = Vec2::new(0.0, 10.0);
        let b = Vec2::new(10.0, 30.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vec2::new(5.0, 20.0));
    }
}
