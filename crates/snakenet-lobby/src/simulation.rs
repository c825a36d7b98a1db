//! Plugs the snake game into the generic sync layer.

use snakenet_sim::{Direction, SnakeGame, TickOutcome};
use snakenet_sync::Simulation;

/// [`Simulation`] over a [`SnakeGame`] with direction inputs.
///
/// An input queues a turn; a step is one game tick.
pub struct SnakeSimulation;

impl Simulation for SnakeSimulation {
    type State = SnakeGame;
    type Input = Direction;
    type Outcome = TickOutcome;

    fn apply_input(state: &mut SnakeGame, dir: &Direction) {
        if !state.queue_direction(*dir) {
            tracing::trace!(direction = %dir, "turn not admitted");
        }
    }

    fn simulate(state: &mut SnakeGame) -> TickOutcome {
        state.tick()
    }
}
