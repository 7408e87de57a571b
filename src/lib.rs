//! Snake Arena - a terminal snake game against concurrent enemy snakes
//!
//! This library provides:
//! - Core game logic and the per-snake worker tasks (game module)
//! - Keyboard mapping (input module)
//! - TUI rendering (render module)
//! - Scoreboard and session stats (metrics module)
//! - The interactive play loop (modes module)

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
