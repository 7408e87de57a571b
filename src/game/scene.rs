//! Frame description handed to the presentation layer
//!
//! Commands are listed in paint order: background, scoreboard, food,
//! enemies, the player last so nothing covers it, then the end banner.

use super::state::{Grid, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeRole {
    Player,
    Enemy { alive: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Background,
    Scoreboard {
        food_eaten: u32,
        enemies_remaining: usize,
        food_remaining: usize,
    },
    Food {
        position: Position,
        phase: u32,
    },
    Snake {
        role: SnakeRole,
        /// Head first
        body: Vec<Position>,
    },
    Banner {
        text: &'static str,
        player_won: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub grid: Grid,
    pub animation_tick: u32,
    pub animation_period: u32,
    pub commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn banner(&self) -> Option<&'static str> {
        self.commands.iter().find_map(|command| match command {
            DrawCommand::Banner { text, .. } => Some(*text),
            _ => None,
        })
    }
}
