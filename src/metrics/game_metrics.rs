use std::time::{Duration, Instant};

/// Stats that survive restarts within one terminal session
pub struct SessionStats {
    pub start_time: Instant,
    pub elapsed_time: Duration,
    pub games_played: u32,
    pub wins: u32,
    /// Longest the player has been at the end of a game
    pub best_length: usize,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            elapsed_time: Duration::ZERO,
            games_played: 0,
            wins: 0,
            best_length: 0,
        }
    }

    /// Refresh the clock of the game in progress
    pub fn update(&mut self) {
        self.elapsed_time = self.start_time.elapsed();
    }

    pub fn on_game_start(&mut self) {
        self.start_time = Instant::now();
        self.elapsed_time = Duration::ZERO;
    }

    pub fn on_game_over(&mut self, player_won: bool, player_length: usize) {
        self.games_played += 1;
        if player_won {
            self.wins += 1;
        }
        self.best_length = self.best_length.max(player_length);
    }

    pub fn format_time(&self) -> String {
        let total_secs = self.elapsed_time.as_secs();
        format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
