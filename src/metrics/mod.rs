pub mod game_metrics;
pub mod scoreboard;

pub use game_metrics::SessionStats;
pub use scoreboard::Scoreboard;
