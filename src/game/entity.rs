//! Entity behavior processes
//!
//! Every snake, player or enemy, runs as its own Tokio task that owns the
//! snake's body and growth credit. The engine reaches it only through a
//! private command channel (ticks and growth in). Moves come back two ways:
//! the reply to a synchronous [`EntityHandle::update`], or the latest
//! [`EntitySnapshot`] the worker published on its watch channel. Each worker
//! is the sole writer of its snapshot; the engine is the sole writer of the
//! world state.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::action::Direction;
use super::error::{EntityCollision, GameError};
use super::state::{CollisionType, Grid, Position, Snake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Player,
    Enemy(usize),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Player => f.write_str("player"),
            EntityId::Enemy(index) => write!(f, "enemy {index}"),
        }
    }
}

/// Result of one tick: the new head, or the collision that killed the snake
pub type MoveOutcome = Result<Position, EntityCollision>;

/// Sender side of the player's directional input
pub type InputSender = mpsc::UnboundedSender<Direction>;

/// One tick delivered to a worker
#[derive(Debug)]
pub struct TickSignal {
    pub tick: u32,
    /// Active food at the time the tick was sent
    pub food: Arc<[Position]>,
    reply: Option<oneshot::Sender<MoveOutcome>>,
}

#[derive(Debug)]
enum Command {
    Tick(TickSignal),
    Grow,
}

/// State a worker publishes after every command
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub body: Vec<Position>,
    pub direction: Direction,
    pub growth_credit: usize,
    pub death: Option<EntityCollision>,
    /// Most recent tick the worker finished
    pub last_tick: Option<u32>,
}

impl EntitySnapshot {
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Segments plus pending growth
    pub fn length(&self) -> usize {
        self.body.len() + self.growth_credit
    }

    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }
}

/// Chooses a snake's heading for the next tick
pub trait Steering: Send + 'static {
    fn steer(&mut self, snake: &Snake, grid: Grid, food: &[Position]) -> Direction;
}

/// Follows the most recent direction the player asked for.
///
/// Requests are taken as-is, so reversing into the neck is a self-collision.
pub struct PlayerSteering {
    input: mpsc::UnboundedReceiver<Direction>,
}

impl PlayerSteering {
    /// Steering plus the sender the input layer feeds it through
    pub fn channel() -> (Self, InputSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { input: rx }, tx)
    }
}

impl Steering for PlayerSteering {
    fn steer(&mut self, snake: &Snake, _grid: Grid, _food: &[Position]) -> Direction {
        let mut direction = snake.direction;
        while let Ok(requested) = self.input.try_recv() {
            direction = requested;
        }
        direction
    }
}

/// Heads for the nearest food, occasionally wandering
pub struct EnemySteering {
    rng: StdRng,
    wander: f64,
}

impl EnemySteering {
    pub fn new(rng: StdRng, wander: f64) -> Self {
        Self { rng, wander }
    }
}

impl Steering for EnemySteering {
    fn steer(&mut self, snake: &Snake, grid: Grid, food: &[Position]) -> Direction {
        let head = snake.head();
        let safe: Vec<Direction> = snake
            .direction
            .turns()
            .filter(|direction| {
                let next = head.moved_in_direction(*direction);
                grid.contains(next) && !snake.collides_with_body(next)
            })
            .collect();

        // Boxed in: keep going and take the hit
        if safe.is_empty() {
            return snake.direction;
        }

        if self.wander > 0.0 && self.rng.gen_bool(self.wander) {
            if let Some(direction) = safe.choose(&mut self.rng) {
                return *direction;
            }
        }

        let Some(target) = food.iter().min_by_key(|food| head.manhattan(**food)) else {
            return if safe.contains(&snake.direction) {
                snake.direction
            } else {
                safe[0]
            };
        };

        safe.iter()
            .copied()
            .min_by_key(|direction| {
                (
                    head.moved_in_direction(*direction).manhattan(*target),
                    *direction != snake.direction,
                )
            })
            .unwrap_or(snake.direction)
    }
}

/// Private state of one snake and the logic run on each tick
pub struct Behavior<S> {
    id: EntityId,
    snake: Snake,
    grid: Grid,
    growth_credit: usize,
    death: Option<EntityCollision>,
    last_tick: Option<u32>,
    steering: S,
}

impl<S: Steering> Behavior<S> {
    pub fn new(id: EntityId, snake: Snake, grid: Grid, steering: S) -> Self {
        Self {
            id,
            snake,
            grid,
            growth_credit: 0,
            death: None,
            last_tick: None,
            steering,
        }
    }

    /// Advance one tick. Once dead, every call returns the same collision.
    pub fn step(&mut self, tick: u32, food: &[Position]) -> MoveOutcome {
        if let Some(death) = self.death {
            return Err(death);
        }
        self.last_tick = Some(tick);

        let direction = self.steering.steer(&self.snake, self.grid, food);
        let next = self.snake.head().moved_in_direction(direction);

        let collision = if !self.grid.contains(next) {
            Some(CollisionType::Wall)
        } else if self.snake.collides_with_body(next) {
            Some(CollisionType::SelfCollision)
        } else {
            None
        };

        if let Some(kind) = collision {
            let death = EntityCollision {
                entity: self.id,
                kind,
                at: next,
            };
            self.death = Some(death);
            return Err(death);
        }

        let grow = self.growth_credit > 0;
        if grow {
            self.growth_credit -= 1;
        }
        self.snake.direction = direction;
        self.snake.advance(next, grow);
        Ok(next)
    }

    /// Grant one growth credit, spent on the next committed move
    pub fn ate_food(&mut self) {
        self.growth_credit += 1;
    }

    pub fn head(&self) -> Position {
        self.snake.head()
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            body: self.snake.body.clone(),
            direction: self.snake.direction,
            growth_credit: self.growth_credit,
            death: self.death,
            last_tick: self.last_tick,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        state: watch::Sender<EntitySnapshot>,
    ) {
        debug!(entity = %self.id, length = self.snake.len(), "worker started");

        while let Some(command) = commands.recv().await {
            match command {
                Command::Grow => {
                    self.ate_food();
                    state.send_replace(self.snapshot());
                }
                Command::Tick(signal) => {
                    let outcome = self.step(signal.tick, &signal.food);
                    // Publish before replying so a reply is never ahead of the snapshot
                    state.send_replace(self.snapshot());
                    trace!(entity = %self.id, tick = signal.tick, ?outcome, "tick processed");

                    if let Some(reply) = signal.reply {
                        let _ = reply.send(outcome);
                    }
                    if let Err(death) = outcome {
                        info!(%death, "worker halted");
                        break;
                    }
                }
            }
        }

        debug!(entity = %self.id, "worker stopped");
    }
}

/// A tick whose outcome has not been collected yet
#[derive(Debug)]
pub struct PendingMove {
    id: EntityId,
    reply: oneshot::Receiver<MoveOutcome>,
}

impl PendingMove {
    pub async fn wait(self) -> Result<Position, GameError> {
        let outcome = self
            .reply
            .await
            .map_err(|_| GameError::WorkerDisconnected(self.id))?;
        Ok(outcome?)
    }
}

/// The engine's end of a running entity worker
#[derive(Debug)]
pub struct EntityHandle {
    id: EntityId,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<EntitySnapshot>,
    task: JoinHandle<()>,
}

impl EntityHandle {
    /// Start the worker task. Must be called inside a Tokio runtime.
    pub fn spawn<S: Steering>(behavior: Behavior<S>) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(behavior.snapshot());
        let id = behavior.id;
        let task = tokio::spawn(behavior.run(inbox, state_tx));

        Self {
            id,
            commands,
            state,
            task,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Send a tick and wait for the worker's answer
    pub async fn update(&self, tick: u32, food: Arc<[Position]>) -> Result<Position, GameError> {
        self.request(tick, food)?.wait().await
    }

    /// Send a tick whose outcome can be collected later
    pub fn request(&self, tick: u32, food: Arc<[Position]>) -> Result<PendingMove, GameError> {
        let (reply_tx, reply) = oneshot::channel();
        self.send(Command::Tick(TickSignal {
            tick,
            food,
            reply: Some(reply_tx),
        }))?;
        Ok(PendingMove { id: self.id, reply })
    }

    /// Send a tick without waiting for it to be processed
    pub fn signal(&self, tick: u32, food: Arc<[Position]>) -> Result<(), GameError> {
        self.send(Command::Tick(TickSignal {
            tick,
            food,
            reply: None,
        }))
    }

    /// Queue one growth credit behind any ticks already sent
    pub fn ate_food(&self) -> Result<(), GameError> {
        self.send(Command::Grow)
    }

    /// Latest published state, possibly behind the last tick sent
    pub fn snapshot(&self) -> EntitySnapshot {
        self.state.borrow().clone()
    }

    pub fn head(&self) -> Position {
        self.state.borrow().head()
    }

    pub fn length(&self) -> usize {
        self.state.borrow().length()
    }

    pub fn is_alive(&self) -> bool {
        self.state.borrow().is_alive()
    }

    /// Close the command channel and wait for the worker to exit
    pub async fn shutdown(self) {
        drop(self.commands);
        let _ = self.task.await;
    }

    fn send(&self, command: Command) -> Result<(), GameError> {
        if let Some(death) = self.state.borrow().death {
            return Err(death.into());
        }
        if self.commands.send(command).is_ok() {
            return Ok(());
        }
        // A worker publishes its death before dropping the inbox
        match self.state.borrow().death {
            Some(death) => Err(death.into()),
            None => Err(GameError::WorkerDisconnected(self.id)),
        }
    }
}
