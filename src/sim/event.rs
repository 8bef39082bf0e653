/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and banner messages.

use crate::domain::geom::GridCell;
use crate::domain::physics::Blocker;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    EchoSpawned { id: u32, duration_ms: f64 },
    EchoSpawnFailed { samples: usize },
    EchoExpired { id: u32 },
    CratePushed { from: GridCell, to: GridCell, by_echo: bool },
    MoveBlocked(Blocker),
    SwitchPressed { id: String },
    DoorOpened,
    LevelSolved,
    LevelRestarted,
}
