use std::fmt;

use super::action::Direction;
use super::error::EntityCollision;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    pub fn manhattan(&self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of the playing field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Position of a column and row, saturating at the coordinate range
    pub fn position(&self, column: usize, row: usize) -> Position {
        Position::new(coordinate(column), coordinate(row))
    }

    /// Check if a position is within the grid bounds
    pub fn contains(&self, pos: Position) -> bool {
        usize::try_from(pos.x).is_ok_and(|x| x < self.width)
            && usize::try_from(pos.y).is_ok_and(|y| y < self.height)
    }

    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Every cell, row by row
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        let grid = *self;
        (0..grid.height).flat_map(move |y| (0..grid.width).map(move |x| grid.position(x, y)))
    }
}

fn coordinate(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

/// A snake's body, head at index 0
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    pub body: Vec<Position>,
    pub direction: Direction,
}

impl Snake {
    /// Create a new snake with given starting position and direction
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let mut body = vec![head];

        // Initial segments trail behind the head
        let (dx, dy) = direction.delta();
        for i in 1..length.max(1) {
            let prev = body[i - 1];
            body.push(prev.moved_by(-dx, -dy));
        }

        Self { body, direction }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Get body segments (excluding head)
    pub fn body_segments(&self) -> &[Position] {
        &self.body[1..]
    }

    /// Check if position collides with snake body (excluding head)
    pub fn collides_with_body(&self, pos: Position) -> bool {
        self.body_segments().contains(&pos)
    }

    /// Commit a new head, keeping the tail when growing
    pub fn advance(&mut self, new_head: Position, grow: bool) {
        self.body.insert(0, new_head);
        if !grow {
            self.body.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Type of collision that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// Snake left the grid
    Wall,
    /// Snake hit itself
    SelfCollision,
}

impl fmt::Display for CollisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionType::Wall => f.write_str("left the grid"),
            CollisionType::SelfCollision => f.write_str("ran into itself"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Active,
    Over,
}

/// Why the game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    FoodExhausted,
    PlayerDied(EntityCollision),
}

/// World state owned by the engine. Entity workers never touch it.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub grid: Grid,
    /// Food eaten by the player
    pub score: u32,
    pub food_remaining: usize,
    pub enemies_remaining: usize,
    /// Shared animation clock, cycles modulo the configured period
    pub animation_tick: u32,
    /// Gameplay frames processed while active
    pub frames: u64,
    phase: GamePhase,
    end_reason: Option<EndReason>,
}

impl GameState {
    pub fn new(grid: Grid, food_remaining: usize, enemies_remaining: usize) -> Self {
        Self {
            grid,
            score: 0,
            food_remaining,
            enemies_remaining,
            animation_tick: 0,
            frames: 0,
            phase: GamePhase::Active,
            end_reason: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == GamePhase::Active
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Transition to Over. Returns false if the game had already ended.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if self.phase == GamePhase::Over {
            return false;
        }
        self.phase = GamePhase::Over;
        self.end_reason = Some(reason);
        true
    }

    pub fn advance_clock(&mut self, period: u32) -> u32 {
        self.animation_tick = (self.animation_tick + 1) % period.max(1);
        self.animation_tick
    }

    /// Remove one active food. Never goes below zero.
    pub fn consume_food(&mut self) {
        self.food_remaining = self.food_remaining.saturating_sub(1);
    }
}
