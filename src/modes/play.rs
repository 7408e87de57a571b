use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::game::{GameConfig, GameEngine, GameError};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::SessionStats;
use crate::render::Renderer;

/// Render at 30 FPS (33ms per frame)
const RENDER_INTERVAL: Duration = Duration::from_millis(33);

/// Interactive session: one engine at a time, restartable
pub struct PlayMode {
    config: GameConfig,
    engine: GameEngine,
    stats: SessionStats,
    renderer: Renderer,
    input_handler: InputHandler,
    tick_interval: Duration,
    should_quit: bool,
}

impl PlayMode {
    /// Start the first game. Must be called inside a Tokio runtime.
    pub fn new(
        config: GameConfig,
        tick_interval: Duration,
        renderer: Renderer,
    ) -> Result<Self, GameError> {
        let engine = GameEngine::start(config.clone())?;

        Ok(Self {
            config,
            engine,
            stats: SessionStats::new(),
            renderer,
            input_handler: InputHandler::new(),
            tick_interval,
            should_quit: false,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        // Run game loop with cleanup
        let result = self.run_game_loop(&mut terminal).await;

        cleanup_terminal(&mut terminal)?;
        self.engine.shutdown().await;

        result
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut tick_timer = interval(self.tick_interval);
        let mut render_timer = interval(RENDER_INTERVAL);

        loop {
            tokio::select! {
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        self.handle_event(event).await?;
                    }
                }

                // Game logic tick; frames after game over only animate
                _ = tick_timer.tick() => {
                    self.update_game().await?;
                }

                _ = render_timer.tick() => {
                    if self.engine.state().is_active() {
                        self.stats.update();
                    }
                    let scene = self.engine.scene();
                    terminal.draw(|frame| {
                        self.renderer.render(frame, &scene, &self.stats);
                    }).context("Failed to draw frame")?;
                }

                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    async fn handle_event(&mut self, event: Event) -> Result<()> {
        if let Event::Key(key) = event {
            // Only process key press events, not release
            if key.kind != KeyEventKind::Press {
                return Ok(());
            }

            match self.input_handler.handle_key_event(key) {
                KeyAction::Steer(direction) => {
                    // A dead player's worker has dropped its input
                    if self.engine.player_input().send(direction).is_err() {
                        warn!(?direction, "input ignored, player worker gone");
                    }
                }
                KeyAction::Restart => self.restart().await?,
                KeyAction::Quit => self.should_quit = true,
                KeyAction::None => {}
            }
        }

        Ok(())
    }

    async fn update_game(&mut self) -> Result<()> {
        let report = self
            .engine
            .update()
            .await
            .context("Frame update failed")?;

        if report.game_over {
            if let Some(outcome) = self.engine.outcome() {
                self.stats
                    .on_game_over(outcome.player_won(), outcome.player_length);
            }
        }

        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        let fresh = GameEngine::start(self.config.clone()).context("Failed to start new game")?;
        let previous = std::mem::replace(&mut self.engine, fresh);
        previous.shutdown().await;
        self.stats.on_game_start();
        info!("game restarted");
        Ok(())
    }
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stderr>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction;

    fn mode() -> PlayMode {
        let config = GameConfig {
            enemy_count: 0,
            ..GameConfig::small()
        };
        PlayMode::new(config, Duration::from_millis(125), Renderer::new()).unwrap()
    }

    #[tokio::test]
    async fn test_game_initialization() {
        let mode = mode();
        assert!(mode.engine.state().is_active());
        assert_eq!(mode.engine.state().score, 0);
        assert_eq!(mode.stats.games_played, 0);
    }

    #[tokio::test]
    async fn test_game_over_recorded_and_restart() {
        let mut mode = mode();
        mode.engine.player_input().send(Direction::Left).unwrap();

        mode.update_game().await.unwrap();
        assert!(!mode.engine.state().is_active());
        assert_eq!(mode.stats.games_played, 1);
        assert_eq!(mode.stats.wins, 1);

        // Frames after game over do not record again
        mode.update_game().await.unwrap();
        assert_eq!(mode.stats.games_played, 1);

        mode.restart().await.unwrap();
        assert!(mode.engine.state().is_active());
        assert_eq!(mode.stats.games_played, 1);
    }
}
