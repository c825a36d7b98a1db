//! The per-player snake state machine.
//!
//! A [`SnakeGame`] is a self-contained value: it serializes to the wire
//! snapshot sent to clients, clones cheaply for prediction, and advances
//! only through [`SnakeGame::queue_direction`] and [`SnakeGame::tick`].
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted ──start()──→ Playing ──tick() hits wall/self──→ GameOver
//! ```
//!
//! Every mutation ends with an invariant check. A failed check is a bug in
//! this module, not bad input, so it panics.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::grid::{in_bounds, next_head};
use crate::{Direction, GameConfig, Position, SimError};

/// Points awarded per food eaten.
pub const FOOD_SCORE: u32 = 10;

// ---------------------------------------------------------------------------
// Status and outcomes
// ---------------------------------------------------------------------------

/// Where a game is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    NotStarted,
    Playing,
    GameOver,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::Playing => write!(f, "PLAYING"),
            Self::GameOver => write!(f, "GAME_OVER"),
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOverCause {
    /// The head would have left the grid.
    Wall,
    /// The head moved onto the snake's own body.
    SelfCollision,
    /// The snake filled the grid; there is nowhere left to put food.
    GridFull,
}

/// The result of one [`SnakeGame::tick`].
///
/// Callers must look at this after every tick: `Terminated` is how the
/// lobby learns that a player is out.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The game was not playing; nothing changed.
    Idle,
    /// The snake moved one cell.
    Advanced { ate_food: bool },
    /// This step ended the game.
    Terminated(GameOverCause),
}

impl TickOutcome {
    /// `true` if this tick ended the game.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

// ---------------------------------------------------------------------------
// SnakeGame
// ---------------------------------------------------------------------------

/// One player's snake, food and score on a fixed grid.
///
/// The serde representation is the wire snapshot:
///
/// ```text
/// { "snake": [{"x":10,"y":10}, ...], "food": {...}, "direction": "RIGHT",
///   "queuedDir1": null, "queuedDir2": null, "score": 0,
///   "gridWidth": 20, "gridHeight": 20, "status": "PLAYING",
///   "tickCount": 0, "startTime": 0, "elapsedTime": 0, ... }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnakeGame {
    /// Head first. Never empty.
    snake: VecDeque<Position>,
    food: Position,
    direction: Direction,
    #[serde(rename = "queuedDir1")]
    queued_direction1: Option<Direction>,
    #[serde(rename = "queuedDir2")]
    queued_direction2: Option<Direction>,
    score: u32,
    grid_width: u32,
    grid_height: u32,
    status: GameStatus,
    tick_count: u64,
    /// Wall-clock ms at `start`. Informational.
    start_time: u64,
    /// `tick_count * tick_interval_ms`. Informational.
    elapsed_time: u64,
    #[serde(default)]
    tick_interval_ms: u64,
    /// Seed for the next food placement. Part of the state so that a
    /// predicted copy places food exactly where the server does.
    #[serde(default)]
    food_seed: u64,
}

impl SnakeGame {
    /// Builds a fresh game with a random food seed.
    ///
    /// The snake is `initial_length` cells long, head at the grid centre,
    /// body extending to the left, heading right.
    ///
    /// # Errors
    /// [`SimError::InvalidConfiguration`] if the grid is empty, the length
    /// is zero, the body would not fit left of centre, or no cell would be
    /// left for food.
    pub fn create(config: &GameConfig) -> Result<Self, SimError> {
        Self::create_seeded(config, rand::rng().random())
    }

    /// Like [`create`](Self::create) with an explicit food seed.
    pub fn create_seeded(config: &GameConfig, food_seed: u64) -> Result<Self, SimError> {
        let (width, height) = (config.grid_width, config.grid_height);
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "grid must be at least 1x1, got {width}x{height}"
            )));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(SimError::InvalidConfiguration(format!(
                "grid {width}x{height} is too large"
            )));
        }
        if config.initial_length < 1 {
            return Err(SimError::InvalidConfiguration(
                "initial snake length must be at least 1".into(),
            ));
        }

        let head = Position::new((width / 2) as i32, (height / 2) as i32);
        let tail_x = head.x as i64 - (config.initial_length as i64 - 1);
        if tail_x < 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "initial length {} does not fit on a {width}-wide grid",
                config.initial_length
            )));
        }
        if config.initial_length as u64 >= width as u64 * height as u64 {
            return Err(SimError::InvalidConfiguration(format!(
                "initial length {} leaves no room for food",
                config.initial_length
            )));
        }

        let snake: VecDeque<Position> = (0..config.initial_length as i32)
            .map(|i| Position::new(head.x - i, head.y))
            .collect();

        let mut game = Self {
            snake,
            food: head,
            direction: Direction::Right,
            queued_direction1: None,
            queued_direction2: None,
            score: 0,
            grid_width: width,
            grid_height: height,
            status: GameStatus::NotStarted,
            tick_count: 0,
            start_time: 0,
            elapsed_time: 0,
            tick_interval_ms: config.tick_interval_ms,
            food_seed,
        };
        // Length < cell count was checked above, so a free cell exists.
        game.food = game
            .place_food()
            .ok_or_else(|| SimError::InvalidConfiguration("no free cell for food".into()))?;
        game.assert_invariants();
        Ok(game)
    }

    /// Moves a `NotStarted` game to `Playing`. Returns `true` if it did.
    ///
    /// Calling this on a game that is already playing (or over) changes
    /// nothing.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.status != GameStatus::NotStarted {
            return false;
        }
        self.status = GameStatus::Playing;
        self.start_time = now_ms;
        self.elapsed_time = 0;
        self.assert_invariants();
        true
    }

    /// The direction the snake will be heading once every queued turn
    /// has been consumed.
    fn effective_direction(&self) -> Direction {
        self.queued_direction1.unwrap_or(self.direction)
    }

    /// Whether `dir` would be admitted by [`queue_direction`](Self::queue_direction).
    ///
    /// Rejects when the game is not playing, when both queue slots are
    /// taken, and when `dir` repeats or reverses the effective direction.
    pub fn can_queue_direction(&self, dir: Direction) -> bool {
        if self.status != GameStatus::Playing || self.queued_direction2.is_some() {
            return false;
        }
        let against = self.effective_direction();
        dir != against && !dir.is_opposite(against)
    }

    /// Queues a turn. Disallowed turns are dropped silently; they arrive
    /// from a racy input stream and are not errors.
    ///
    /// Returns `true` if the turn was queued.
    pub fn queue_direction(&mut self, dir: Direction) -> bool {
        if !self.can_queue_direction(dir) {
            return false;
        }
        if self.queued_direction1.is_none() {
            self.queued_direction1 = Some(dir);
        } else {
            self.queued_direction2 = Some(dir);
        }
        self.assert_invariants();
        true
    }

    /// Advances the game by exactly one step.
    ///
    /// The tail is dropped before the self-collision check, so moving into
    /// the cell the tail just left is legal.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != GameStatus::Playing {
            return TickOutcome::Idle;
        }

        if let Some(next) = self.queued_direction1.take() {
            self.direction = next;
            self.queued_direction1 = self.queued_direction2.take();
        }

        let new_head = next_head(self.head(), self.direction);
        if !in_bounds(new_head, self.grid_width, self.grid_height) {
            return self.finish(GameOverCause::Wall);
        }

        let ate_food = new_head == self.food;
        self.snake.push_front(new_head);
        if ate_food {
            self.score += FOOD_SCORE;
        } else {
            self.snake.pop_back();
        }

        if self.snake.iter().skip(1).any(|cell| *cell == new_head) {
            return self.finish(GameOverCause::SelfCollision);
        }

        if ate_food {
            match self.place_food() {
                Some(food) => self.food = food,
                None => return self.finish(GameOverCause::GridFull),
            }
        }

        self.tick_count += 1;
        self.elapsed_time = self.tick_count * self.tick_interval_ms;
        self.assert_invariants();
        TickOutcome::Advanced { ate_food }
    }

    fn finish(&mut self, cause: GameOverCause) -> TickOutcome {
        self.status = GameStatus::GameOver;
        tracing::trace!(?cause, score = self.score, tick = self.tick_count, "snake game over");
        self.assert_invariants();
        TickOutcome::Terminated(cause)
    }

    /// Picks a free cell by rejection sampling from `food_seed`, then
    /// advances the seed. `None` if the snake covers the grid.
    fn place_food(&mut self) -> Option<Position> {
        let cells = self.grid_width as u64 * self.grid_height as u64;
        if self.snake.len() as u64 >= cells {
            return None;
        }
        let occupied: HashSet<Position> = self.snake.iter().copied().collect();
        let mut rng = StdRng::seed_from_u64(self.food_seed);
        let food = loop {
            let candidate = Position::new(
                rng.random_range(0..self.grid_width as i32),
                rng.random_range(0..self.grid_height as i32),
            );
            if !occupied.contains(&candidate) {
                break candidate;
            }
        };
        self.food_seed = rng.random();
        Some(food)
    }

    // -- Invariants ------------------------------------------------------

    /// Checks the representation invariants.
    ///
    /// # Errors
    /// A description of the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        let head = self.snake.front().ok_or("snake is empty")?;
        if let Some(cell) = self
            .snake
            .iter()
            .find(|c| !in_bounds(**c, self.grid_width, self.grid_height))
        {
            return Err(format!("snake cell {cell} is off-grid"));
        }

        let mut seen = HashSet::with_capacity(self.snake.len());
        for cell in self.snake.iter().skip(1) {
            if !seen.insert(*cell) {
                return Err(format!("snake body overlaps itself at {cell}"));
            }
        }
        if self.status != GameStatus::GameOver && seen.contains(head) {
            return Err(format!("live snake head {head} overlaps its body"));
        }

        if !in_bounds(self.food, self.grid_width, self.grid_height) {
            return Err(format!("food {} is off-grid", self.food));
        }
        let grid_full =
            self.snake.len() as u64 >= self.grid_width as u64 * self.grid_height as u64;
        if !grid_full && self.snake.contains(&self.food) {
            return Err(format!("food {} is on the snake", self.food));
        }

        match (self.queued_direction1, self.queued_direction2) {
            (None, Some(_)) => return Err("second queue slot filled before the first".into()),
            (Some(a), Some(b)) if a == b => {
                return Err(format!("both queue slots hold {a}"));
            }
            _ => {}
        }
        Ok(())
    }

    fn assert_invariants(&self) {
        if let Err(violation) = self.check_invariants() {
            panic!("snake game invariant violated: {violation}");
        }
    }

    // -- Accessors -------------------------------------------------------

    /// Body cells, head first.
    pub fn snake(&self) -> &VecDeque<Position> {
        &self.snake
    }

    pub fn head(&self) -> Position {
        // Non-empty by invariant.
        self.snake[0]
    }

    pub fn len(&self) -> usize {
        self.snake.len()
    }

    pub fn food(&self) -> Position {
        self.food
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The two queue slots, in consumption order.
    pub fn queued_directions(&self) -> (Option<Direction>, Option<Direction>) {
        (self.queued_direction1, self.queued_direction2)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    pub fn is_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn start_time_ms(&self) -> u64 {
        self.start_time
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_time
    }

    /// Period between steps this game was configured with.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }
}

// =========================================================================
// Tests
// =========================================================================
