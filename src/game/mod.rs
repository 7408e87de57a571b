//! Core game logic
//!
//! The engine owns the world state and runs one worker task per snake. Nothing
//! here touches the terminal; the render layer consumes [`Scene`] values.

pub mod action;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod food;
pub mod scene;
pub mod state;

// Re-export commonly used types
pub use action::Direction;
pub use config::{EnemySync, GameConfig, MAX_GRID_SIDE};
pub use engine::{FrameReport, GameEngine, Outcome};
pub use entity::{EntityHandle, EntityId, EntitySnapshot, InputSender};
pub use error::{EntityCollision, GameError};
pub use food::{FoodHandle, FoodRegistry, FoodSlot};
pub use scene::{DrawCommand, Scene, SnakeRole};
pub use state::{CollisionType, EndReason, GamePhase, GameState, Grid, Position, Snake};
