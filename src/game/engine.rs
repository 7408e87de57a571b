use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::{
    action::Direction,
    config::{EnemySync, GameConfig},
    entity::{
        Behavior, EnemySteering, EntityHandle, EntityId, EntitySnapshot, InputSender,
        PlayerSteering,
    },
    error::GameError,
    food::FoodRegistry,
    scene::{DrawCommand, Scene, SnakeRole},
    state::{EndReason, GameState, Grid, Position, Snake},
};
use crate::metrics::Scoreboard;

/// Random probes per enemy before scanning every placement
const SPAWN_ATTEMPTS: usize = 64;

/// What happened during one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Food consumed this frame and who ate it
    pub eaten: Vec<(EntityId, Position)>,
    /// Enemies eliminated this frame
    pub eliminated: Vec<EntityId>,
    /// Whether this frame ended the game
    pub game_over: bool,
}

/// Final standings, available once the game is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub player_length: usize,
    /// Longest enemy, dead or alive. Zero without enemies.
    pub best_enemy_length: usize,
}

impl Outcome {
    pub fn player_won(&self) -> bool {
        self.player_length > self.best_enemy_length
    }

    pub fn banner(&self) -> &'static str {
        if self.player_won() {
            "Game over\nYou win. You ate the most food"
        } else {
            "Game over\nYou lose. You did not eat the most food :("
        }
    }
}

struct EnemySlot {
    handle: EntityHandle,
    eliminated: bool,
}

/// Owns the world state and drives every entity worker once per frame
pub struct GameEngine {
    config: GameConfig,
    state: GameState,
    food: FoodRegistry,
    scoreboard: Scoreboard,
    player: EntityHandle,
    enemies: Vec<EnemySlot>,
    input: InputSender,
}

impl GameEngine {
    /// Set up a session and spawn one worker per snake.
    ///
    /// Must be called inside a Tokio runtime. Running out of room for a snake
    /// or a food item is fatal here.
    pub fn start(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;

        let grid = config.grid();
        let length = config.initial_snake_length;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let player_snake = Snake::new(
            grid.position((grid.width / 2).max(length - 1), grid.height / 2),
            Direction::Right,
            length,
        );
        let mut occupied: HashSet<Position> = player_snake.body.iter().copied().collect();

        let mut enemy_snakes = Vec::with_capacity(config.enemy_count);
        for index in 0..config.enemy_count {
            let snake = spawn_snake(grid, length, &occupied, &mut rng)
                .ok_or(GameError::SpawnExhausted(EntityId::Enemy(index)))?;
            occupied.extend(snake.body.iter().copied());
            enemy_snakes.push(snake);
        }

        let food = FoodRegistry::populate(grid, config.food_count, &occupied, &mut rng)?;

        // Nothing below can fail, so no worker outlives a failed start
        let (steering, input) = PlayerSteering::channel();
        let player = EntityHandle::spawn(Behavior::new(
            EntityId::Player,
            player_snake,
            grid,
            steering,
        ));

        let enemies = enemy_snakes
            .into_iter()
            .enumerate()
            .map(|(index, snake)| {
                let steering =
                    EnemySteering::new(StdRng::seed_from_u64(rng.gen()), config.enemy_wander);
                let behavior = Behavior::new(EntityId::Enemy(index), snake, grid, steering);
                EnemySlot {
                    handle: EntityHandle::spawn(behavior),
                    eliminated: false,
                }
            })
            .collect();

        info!(
            width = grid.width,
            height = grid.height,
            food = config.food_count,
            enemies = config.enemy_count,
            sync = ?config.enemy_sync,
            "game started"
        );

        Ok(Self {
            state: GameState::new(grid, config.food_count, config.enemy_count),
            scoreboard: Scoreboard::new(config.enemy_count),
            config,
            food,
            player,
            enemies,
            input,
        })
    }

    /// Run one frame.
    ///
    /// Snake collisions end the game or eliminate an enemy and are never
    /// returned. Food registry faults and lost workers are.
    pub async fn update(&mut self) -> Result<FrameReport, GameError> {
        let mut report = FrameReport::default();

        if self.state.is_active() {
            self.play_frame(&mut report).await?;
        }

        self.food.update(self.state.animation_tick)?;
        Ok(report)
    }

    async fn play_frame(&mut self, report: &mut FrameReport) -> Result<(), GameError> {
        if self.state.food_remaining == 0 {
            self.finish(EndReason::FoodExhausted, report);
            return Ok(());
        }

        let tick = self.state.advance_clock(self.config.animation_period);
        self.state.frames += 1;
        let food: Arc<[Position]> = self.food.active_positions().into();

        match self.player.update(tick, food.clone()).await {
            Ok(_) => {}
            Err(GameError::EntityCollision(death)) => {
                self.finish(EndReason::PlayerDied(death), report);
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        self.dispatch_enemies(tick, &food).await?;
        self.sweep_eliminated(report);

        let head = self.player.head();
        if self.consume_food_at(head) {
            self.state.score += 1;
            self.scoreboard.ate_food();
            self.player.ate_food()?;
            debug!(at = %head, score = self.state.score, "player ate food");
            report.eaten.push((EntityId::Player, head));
        }

        self.feed_enemies(report)
    }

    /// Let each enemy still in play eat the food under its published head.
    ///
    /// The growth credit is sent before the food is marked eaten. An enemy
    /// that died since its last snapshot refuses the credit and the food
    /// stays in play.
    fn feed_enemies(&mut self, report: &mut FrameReport) -> Result<(), GameError> {
        for index in 0..self.enemies.len() {
            let slot = &self.enemies[index];
            if slot.eliminated {
                continue;
            }
            let head = slot.handle.head();
            if self.food.find_at(head).is_none() {
                continue;
            }
            if allow_collision(slot.handle.ate_food())?.is_none() {
                continue;
            }

            let id = slot.handle.id();
            if self.consume_food_at(head) {
                debug!(entity = %id, at = %head, "enemy ate food");
                report.eaten.push((id, head));
            }
        }

        Ok(())
    }

    /// Deliver this frame's tick to every enemy still in play, in index order
    async fn dispatch_enemies(
        &self,
        tick: u32,
        food: &Arc<[Position]>,
    ) -> Result<(), GameError> {
        let active = self.enemies.iter().filter(|slot| !slot.eliminated);

        match self.config.enemy_sync {
            EnemySync::Eventual => {
                for slot in active {
                    allow_collision(slot.handle.signal(tick, food.clone()))?;
                }
            }
            EnemySync::Acknowledged => {
                // All ticks go out before any reply is awaited
                let mut pending = Vec::new();
                for slot in active {
                    let request = allow_collision(slot.handle.request(tick, food.clone()))?;
                    if let Some(request) = request {
                        pending.push(request);
                    }
                }
                for request in pending {
                    allow_collision(request.wait().await)?;
                }
            }
        }

        Ok(())
    }

    /// Eliminate every enemy whose worker has published its death
    fn sweep_eliminated(&mut self, report: &mut FrameReport) {
        for slot in self.enemies.iter_mut().filter(|slot| !slot.eliminated) {
            if let Some(death) = slot.handle.snapshot().death {
                slot.eliminated = true;
                self.state.enemies_remaining = self.state.enemies_remaining.saturating_sub(1);
                self.scoreboard.enemy_died();
                info!(%death, remaining = self.state.enemies_remaining, "enemy eliminated");
                report.eliminated.push(slot.handle.id());
            }
        }
    }

    /// Eat the first active food at `pos`, if any
    fn consume_food_at(&mut self, pos: Position) -> bool {
        let Some(handle) = self.food.find_at(pos) else {
            return false;
        };
        if !self.food.mark_eaten(handle) {
            return false;
        }
        self.state.consume_food();
        true
    }

    fn finish(&mut self, reason: EndReason, report: &mut FrameReport) {
        if self.state.end(reason) {
            report.game_over = true;
            let outcome = self.outcome();
            info!(?reason, ?outcome, score = self.state.score, "game over");
        }
    }

    /// Standings, once the game is over
    pub fn outcome(&self) -> Option<Outcome> {
        if self.state.is_active() {
            return None;
        }
        let best_enemy_length = self
            .enemies
            .iter()
            .map(|slot| slot.handle.length())
            .max()
            .unwrap_or(0);

        Some(Outcome {
            player_length: self.player.length(),
            best_enemy_length,
        })
    }

    /// Describe the current frame for the presentation layer
    pub fn scene(&self) -> Scene {
        let mut commands = vec![
            DrawCommand::Background,
            DrawCommand::Scoreboard {
                food_eaten: self.scoreboard.food_eaten,
                enemies_remaining: self.scoreboard.enemies_remaining,
                food_remaining: self.state.food_remaining,
            },
        ];

        commands.extend(
            self.food
                .iter_active()
                .map(|(_, position, phase)| DrawCommand::Food { position, phase }),
        );

        commands.extend(self.enemies.iter().map(|slot| {
            let snapshot = slot.handle.snapshot();
            DrawCommand::Snake {
                role: SnakeRole::Enemy {
                    alive: snapshot.is_alive(),
                },
                body: snapshot.body,
            }
        }));

        commands.push(DrawCommand::Snake {
            role: SnakeRole::Player,
            body: self.player.snapshot().body,
        });

        if let Some(outcome) = self.outcome() {
            commands.push(DrawCommand::Banner {
                text: outcome.banner(),
                player_won: outcome.player_won(),
            });
        }

        Scene {
            grid: self.state.grid,
            animation_tick: self.state.animation_tick,
            animation_period: self.config.animation_period,
            commands,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn food(&self) -> &FoodRegistry {
        &self.food
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn player(&self) -> EntitySnapshot {
        self.player.snapshot()
    }

    pub fn enemies(&self) -> Vec<EntitySnapshot> {
        self.enemies.iter().map(|slot| slot.handle.snapshot()).collect()
    }

    /// Where the input layer sends the player's direction requests
    pub fn player_input(&self) -> InputSender {
        self.input.clone()
    }

    /// Stop every worker and wait for them to exit
    pub async fn shutdown(self) {
        self.player.shutdown().await;
        for slot in self.enemies {
            slot.handle.shutdown().await;
        }
        debug!("workers stopped");
    }
}

/// Treat a snake collision as a non-event, keeping every other error
fn allow_collision<T>(result: Result<T, GameError>) -> Result<Option<T>, GameError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(GameError::EntityCollision(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Find a free straight placement for a new snake, heading away from its tail
fn spawn_snake<R: Rng>(
    grid: Grid,
    length: usize,
    occupied: &HashSet<Position>,
    rng: &mut R,
) -> Option<Snake> {
    let fits = |snake: &Snake| {
        snake
            .body
            .iter()
            .all(|pos| grid.contains(*pos) && !occupied.contains(pos))
    };

    for _ in 0..SPAWN_ATTEMPTS {
        let head = grid.position(rng.gen_range(0..grid.width), rng.gen_range(0..grid.height));
        let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
        let snake = Snake::new(head, direction, length);
        if fits(&snake) {
            return Some(snake);
        }
    }

    grid.cells()
        .flat_map(|head| {
            Direction::ALL
                .into_iter()
                .map(move |direction| Snake::new(head, direction, length))
        })
        .find(|snake| fits(snake))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{CollisionType, GamePhase};

    fn solo_config() -> GameConfig {
        GameConfig {
            enemy_count: 0,
            food_count: 1,
            ..GameConfig::small()
        }
    }

    /// Replace the engine's food with items at exactly `targets`
    fn place_food(engine: &mut GameEngine, targets: &[Position]) {
        let grid = engine.state.grid;
        let blocked: HashSet<_> = grid.cells().filter(|pos| !targets.contains(pos)).collect();
        let mut rng = StdRng::seed_from_u64(0);
        engine.food = FoodRegistry::populate(grid, targets.len(), &blocked, &mut rng).unwrap();
        engine.state.food_remaining = targets.len();
    }

    #[tokio::test]
    async fn test_start() {
        let engine = GameEngine::start(GameConfig::small()).unwrap();

        assert!(engine.state().is_active());
        assert_eq!(engine.state().food_remaining, 3);
        assert_eq!(engine.food().active_count(), 3);
        assert_eq!(engine.enemies().len(), 1);
        assert_eq!(engine.player().head(), Position::new(5, 5));

        let mut cells = HashSet::new();
        let bodies = engine
            .enemies()
            .into_iter()
            .chain(std::iter::once(engine.player()))
            .flat_map(|snapshot| snapshot.body);
        for pos in bodies.chain(engine.food().active_positions()) {
            assert!(cells.insert(pos), "{pos} used twice");
        }
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let config = GameConfig::new(50, 5).with_grid(4, 4);
        assert!(matches!(
            GameEngine::start(config),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_player_moves_each_frame() {
        let mut engine = GameEngine::start(solo_config()).unwrap();
        place_food(&mut engine, &[Position::new(0, 0)]);

        engine.update().await.unwrap();
        engine.update().await.unwrap();

        assert_eq!(engine.player().head(), Position::new(7, 5));
        assert_eq!(engine.state().frames, 2);
        assert_eq!(engine.state().animation_tick, 2);
    }

    #[tokio::test]
    async fn test_last_food_ends_game_next_frame() {
        let mut engine = GameEngine::start(solo_config()).unwrap();
        place_food(&mut engine, &[Position::new(6, 5)]);

        let report = engine.update().await.unwrap();
        assert_eq!(report.eaten, vec![(EntityId::Player, Position::new(6, 5))]);
        assert!(!report.game_over);
        assert_eq!(engine.state().food_remaining, 0);
        assert_eq!(engine.state().score, 1);
        assert_eq!(engine.scoreboard().food_eaten, 1);
        assert!(engine.state().is_active());

        let head_before = engine.player().head();
        let report = engine.update().await.unwrap();
        assert!(report.game_over);
        assert_eq!(engine.state().phase(), GamePhase::Over);
        assert_eq!(engine.state().end_reason(), Some(EndReason::FoodExhausted));
        // The over check runs before anything moves
        assert_eq!(engine.player().head(), head_before);
        assert_eq!(engine.state().frames, 1);
    }

    #[tokio::test]
    async fn test_growth_visible_next_tick() {
        let mut engine = GameEngine::start(solo_config()).unwrap();
        place_food(&mut engine, &[Position::new(6, 5), Position::new(0, 0)]);

        engine.update().await.unwrap();
        engine.update().await.unwrap();

        let player = engine.player();
        assert_eq!(player.body.len(), 4);
        assert_eq!(player.growth_credit, 0);
    }

    #[tokio::test]
    async fn test_reversing_ends_game_with_loss() {
        let config = GameConfig {
            food_count: 1,
            ..GameConfig::small()
        };
        let mut engine = GameEngine::start(config).unwrap();
        engine.player_input().send(Direction::Left).unwrap();

        let report = engine.update().await.unwrap();

        assert!(report.game_over);
        let Some(EndReason::PlayerDied(death)) = engine.state().end_reason() else {
            panic!("expected the player to die");
        };
        assert_eq!(death.kind, CollisionType::SelfCollision);
        assert_eq!(death.at, Position::new(4, 5));

        // Equal lengths are not a win
        let outcome = engine.outcome().unwrap();
        assert_eq!(outcome.player_length, 3);
        assert_eq!(outcome.best_enemy_length, 3);
        assert!(!outcome.player_won());
        assert!(outcome.banner().contains("You lose"));
    }

    #[tokio::test]
    async fn test_player_wins_without_enemies() {
        let mut engine = GameEngine::start(solo_config()).unwrap();
        engine.player_input().send(Direction::Left).unwrap();
        engine.update().await.unwrap();

        let outcome = engine.outcome().unwrap();
        assert!(outcome.player_won());
        assert_eq!(
            engine.scene().banner(),
            Some("Game over\nYou win. You ate the most food")
        );
    }

    #[tokio::test]
    async fn test_no_mutation_after_game_over() {
        let mut engine = GameEngine::start(GameConfig::small()).unwrap();
        engine.player_input().send(Direction::Left).unwrap();
        engine.update().await.unwrap();
        let state = engine.state().clone();
        let enemies = engine.enemies();

        for _ in 0..3 {
            let report = engine.update().await.unwrap();
            assert_eq!(report, FrameReport::default());
        }

        assert_eq!(engine.state(), &state);
        assert_eq!(engine.enemies(), enemies);
    }

    #[tokio::test]
    async fn test_player_wall_death() {
        let mut engine = GameEngine::start(solo_config()).unwrap();
        place_food(&mut engine, &[Position::new(0, 0)]);

        let mut frames = 0;
        while engine.state().is_active() {
            engine.update().await.unwrap();
            frames += 1;
            assert!(frames <= 10, "player should hit the wall");
            let head = engine.player().head();
            assert!(engine.state().grid.contains(head));
        }

        let Some(EndReason::PlayerDied(death)) = engine.state().end_reason() else {
            panic!("expected a wall death");
        };
        assert_eq!(death.kind, CollisionType::Wall);
        assert_eq!(death.at, Position::new(10, 5));
    }

    #[tokio::test]
    async fn test_enemy_eliminated_once() {
        let config = GameConfig {
            enemy_wander: 0.0,
            ..GameConfig::small()
        };
        let mut engine = GameEngine::start(config).unwrap();

        // Box the enemy in against the wall
        let snake = Snake::new(Position::new(9, 0), Direction::Right, 3);
        replace_enemy(
            &mut engine,
            Snake {
                direction: Direction::Up,
                ..snake
            },
        );

        let mut eliminated = Vec::new();
        for _ in 0..3 {
            if !engine.state().is_active() {
                break;
            }
            eliminated.extend(engine.update().await.unwrap().eliminated);
        }

        assert_eq!(eliminated, vec![EntityId::Enemy(0)]);
        assert_eq!(engine.state().enemies_remaining, 0);
        assert_eq!(engine.scoreboard().enemies_remaining, 0);
        assert!(!engine.enemies()[0].is_alive());
    }

    /// Swap enemy 0 for a fresh worker with the given body
    fn replace_enemy(engine: &mut GameEngine, snake: Snake) {
        let behavior = Behavior::new(
            EntityId::Enemy(0),
            snake,
            engine.state.grid,
            EnemySteering::new(StdRng::seed_from_u64(3), 0.0),
        );
        engine.enemies[0].handle = EntityHandle::spawn(behavior);
    }

    #[tokio::test]
    async fn test_enemy_eats_food() {
        let mut engine = GameEngine::start(GameConfig::small()).unwrap();
        replace_enemy(
            &mut engine,
            Snake::new(Position::new(2, 8), Direction::Right, 3),
        );
        place_food(&mut engine, &[Position::new(3, 8), Position::new(0, 0)]);

        let report = engine.update().await.unwrap();

        assert_eq!(report.eaten, vec![(EntityId::Enemy(0), Position::new(3, 8))]);
        assert_eq!(engine.state().food_remaining, 1);
        assert_eq!(engine.food().active_count(), 1);
        assert_eq!(engine.state().score, 0);
        assert_eq!(engine.scoreboard().food_eaten, 0);

        // One credit, spent on the next move
        let report = engine.update().await.unwrap();
        assert!(report.eaten.is_empty());
        let enemy = &engine.enemies()[0];
        assert_eq!(enemy.body.len(), 4);
        assert_eq!(enemy.growth_credit, 0);
    }

    #[tokio::test]
    async fn test_dead_enemy_does_not_eat() {
        let mut engine = GameEngine::start(GameConfig::small()).unwrap();
        let snake = Snake::new(Position::new(9, 0), Direction::Right, 3);
        replace_enemy(
            &mut engine,
            Snake {
                direction: Direction::Up,
                ..snake
            },
        );
        place_food(&mut engine, &[Position::new(9, 0), Position::new(0, 9)]);

        // Killed outside the frame, so the sweep has not seen it yet
        let food: Arc<[Position]> = engine.food.active_positions().into();
        assert!(engine.enemies[0].handle.update(1, food).await.is_err());
        assert!(!engine.enemies[0].eliminated);

        let mut report = FrameReport::default();
        engine.feed_enemies(&mut report).unwrap();

        assert!(report.eaten.is_empty());
        assert_eq!(engine.state().food_remaining, 2);
        assert_eq!(engine.food().active_count(), 2);
        assert_eq!(engine.enemies()[0].growth_credit, 0);
    }

    #[tokio::test]
    async fn test_food_count_invariants_with_eventual_enemies() {
        let config = GameConfig {
            grid_width: 12,
            grid_height: 12,
            food_count: 20,
            enemy_count: 3,
            enemy_sync: EnemySync::Eventual,
            seed: Some(11),
            ..GameConfig::default()
        };
        let mut engine = GameEngine::start(config).unwrap();
        let mut previous = engine.state().food_remaining;

        for _ in 0..50 {
            let report = engine.update().await.unwrap();
            let remaining = engine.state().food_remaining;

            assert!(remaining <= previous);
            assert_eq!(previous - remaining, report.eaten.len());
            assert_eq!(remaining, engine.food().active_count());

            // At most one food per snake per frame
            let mut eaters = HashSet::new();
            assert!(report.eaten.iter().all(|(id, _)| eaters.insert(*id)));

            previous = remaining;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_scene_paint_order() {
        let engine = GameEngine::start(GameConfig::small()).unwrap();
        let scene = engine.scene();

        assert_eq!(scene.commands[0], DrawCommand::Background);
        assert!(matches!(scene.commands[1], DrawCommand::Scoreboard { .. }));
        assert!(matches!(
            scene.commands.last(),
            Some(DrawCommand::Snake {
                role: SnakeRole::Player,
                ..
            })
        ));

        let first_snake = scene
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Snake { .. }))
            .unwrap();
        assert!(scene.commands[..first_snake]
            .iter()
            .skip(2)
            .all(|c| matches!(c, DrawCommand::Food { .. })));
        assert_eq!(scene.banner(), None);
    }

    #[test]
    fn test_spawn_snake_fills_last_gap() {
        let grid = Grid::new(3, 3);
        let mut occupied: HashSet<_> = grid.cells().collect();
        occupied.remove(&Position::new(0, 2));
        occupied.remove(&Position::new(1, 2));
        let mut rng = StdRng::seed_from_u64(5);

        let snake = spawn_snake(grid, 2, &occupied, &mut rng).unwrap();
        let body: HashSet<_> = snake.body.into_iter().collect();
        assert_eq!(
            body,
            HashSet::from([Position::new(0, 2), Position::new(1, 2)])
        );

        occupied.insert(Position::new(0, 2));
        assert!(spawn_snake(grid, 2, &occupied, &mut rng).is_none());
    }
}
