//! Game errors

use thiserror::Error;

use super::entity::EntityId;
use super::state::{CollisionType, Position};

/// A snake made an invalid move. Ends the game for the player, eliminates an enemy.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{entity} {kind} at {at}")]
pub struct EntityCollision {
    pub entity: EntityId,
    pub kind: CollisionType,
    /// The cell the snake tried to move into
    pub at: Position,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error(transparent)]
    EntityCollision(#[from] EntityCollision),

    #[error("No free cell for food on a {width}x{height} grid")]
    RegistryExhausted { width: usize, height: usize },

    #[error("No room to spawn {0}")]
    SpawnExhausted(EntityId),

    #[error("Food slot {slot} is outside the grid at {at}")]
    FoodOutOfBounds { slot: usize, at: Position },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker for {0} stopped responding")]
    WorkerDisconnected(EntityId),
}
