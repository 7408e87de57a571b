use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::GameError;
use super::state::Grid;

/// Largest width or height a grid may have
pub const MAX_GRID_SIDE: usize = u16::MAX as usize;

/// How the engine observes enemy moves within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemySync {
    /// Ticks are sent without waiting. Food checks read whichever head the
    /// enemy last published, which may lag the tick just sent by one step.
    #[default]
    Eventual,
    /// Every enemy acknowledges its tick before food checks run.
    Acknowledged,
}

/// Configuration for a game session. Fields missing from a config file
/// take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Initial length of every snake
    pub initial_snake_length: usize,
    /// Food items placed at start; the game ends when all are eaten
    pub food_count: usize,
    /// Computer-controlled snakes
    pub enemy_count: usize,
    /// Modulus of the shared animation clock
    pub animation_period: u32,
    pub enemy_sync: EnemySync,
    /// Chance per tick that an enemy takes a random safe turn
    pub enemy_wander: f64,
    /// Seed for placement and enemy randomness
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            initial_snake_length: 3,
            food_count: 10,
            enemy_count: 3,
            animation_period: 10,
            enemy_sync: EnemySync::default(),
            enemy_wander: 0.1,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a configuration from the two session parameters
    pub fn new(food_count: usize, enemy_count: usize) -> Self {
        Self {
            food_count,
            enemy_count,
            ..Default::default()
        }
    }

    /// Small deterministic setup for tests
    pub fn small() -> Self {
        Self {
            grid_width: 10,
            grid_height: 10,
            food_count: 3,
            enemy_count: 1,
            enemy_sync: EnemySync::Acknowledged,
            seed: Some(7),
            ..Default::default()
        }
    }

    pub fn with_grid(mut self, width: usize, height: usize) -> Self {
        self.grid_width = width;
        self.grid_height = height;
        self
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.grid_width, self.grid_height)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Write this configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))
    }

    /// Check that a session with this configuration can be set up
    pub fn validate(&self) -> Result<(), GameError> {
        if self.grid_width < 2 || self.grid_height < 2 {
            return Err(GameError::InvalidConfig(format!(
                "grid must be at least 2x2, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }

        if self.grid_width > MAX_GRID_SIDE || self.grid_height > MAX_GRID_SIDE {
            return Err(GameError::InvalidConfig(format!(
                "grid sides cannot exceed {MAX_GRID_SIDE}, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }

        if self.initial_snake_length == 0 {
            return Err(GameError::InvalidConfig(
                "initial_snake_length must be at least 1".to_string(),
            ));
        }

        if self.initial_snake_length > self.grid_width {
            return Err(GameError::InvalidConfig(format!(
                "initial_snake_length ({}) cannot exceed grid_width ({})",
                self.initial_snake_length, self.grid_width
            )));
        }

        if self.food_count == 0 {
            return Err(GameError::InvalidConfig(
                "food_count must be at least 1".to_string(),
            ));
        }

        if self.animation_period == 0 {
            return Err(GameError::InvalidConfig(
                "animation_period must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.enemy_wander) {
            return Err(GameError::InvalidConfig(format!(
                "enemy_wander must be in [0, 1], got {}",
                self.enemy_wander
            )));
        }

        let needed = (self.enemy_count + 1) * self.initial_snake_length + self.food_count;
        if needed > self.grid().cell_count() {
            return Err(GameError::InvalidConfig(format!(
                "{} snakes and {} food need {} cells, grid has {}",
                self.enemy_count + 1,
                self.food_count,
                needed,
                self.grid().cell_count()
            )));
        }

        Ok(())
    }
}
