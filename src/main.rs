use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use snake_arena::game::{EnemySync, GameConfig};
use snake_arena::modes::PlayMode;
use snake_arena::render::Renderer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snake_arena")]
#[command(version, about = "Race enemy snakes for food in your terminal")]
struct Cli {
    /// JSON game configuration; the flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Food items on the grid; the game ends when all are eaten [default: 10]
    #[arg(long)]
    food: Option<usize>,

    /// Computer-controlled snakes [default: 3]
    #[arg(long)]
    enemies: Option<usize>,

    /// Grid width [default: 20]
    #[arg(long)]
    width: Option<usize>,

    /// Grid height [default: 20]
    #[arg(long)]
    height: Option<usize>,

    /// How the game observes enemy moves each tick [default: eventual]
    #[arg(long)]
    sync: Option<SyncMode>,

    /// Seed for food placement and enemy behavior
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds per game tick
    #[arg(long, default_value = "125")]
    tick_ms: u64,

    /// Text file tiled behind the grid
    #[arg(long)]
    background: Option<PathBuf>,

    /// Write logs to this file (the terminal is taken by the game)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };

        if let Some(food) = self.food {
            config.food_count = food;
        }
        if let Some(enemies) = self.enemies {
            config.enemy_count = enemies;
        }
        if let Some(width) = self.width {
            config.grid_width = width;
        }
        if let Some(height) = self.height {
            config.grid_height = height;
        }
        if let Some(sync) = self.sync {
            config.enemy_sync = sync.into();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SyncMode {
    /// Enemy positions may lag one tick behind
    Eventual,
    /// Wait for every enemy before checking food
    Acknowledged,
}

impl From<SyncMode> for EnemySync {
    fn from(mode: SyncMode) -> Self {
        match mode {
            SyncMode::Eventual => EnemySync::Eventual,
            SyncMode::Acknowledged => EnemySync::Acknowledged,
        }
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    let config = cli.game_config()?;

    let renderer = Renderer::with_background(cli.background.as_deref());
    let mode = PlayMode::new(config, Duration::from_millis(cli.tick_ms.max(1)), renderer)
        .context("Failed to start game")?;
    mode.run().await?;

    Ok(())
}
