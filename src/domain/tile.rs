/// Static tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Floor,
    Wall, // Blocks movement and pushing
}

impl Tile {
    /// Does this tile stop the player and crates?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall)
    }
}
