//! Heads-up counters updated by the engine and read by the renderer

/// Passive record of scoring and elimination events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    /// Food eaten by the player
    pub food_eaten: u32,
    /// Enemies still in play
    pub enemies_remaining: usize,
}

impl Scoreboard {
    pub fn new(enemies: usize) -> Self {
        Self {
            food_eaten: 0,
            enemies_remaining: enemies,
        }
    }

    pub fn ate_food(&mut self) {
        self.food_eaten += 1;
    }

    pub fn enemy_died(&mut self) {
        self.enemies_remaining = self.enemies_remaining.saturating_sub(1);
    }
}
