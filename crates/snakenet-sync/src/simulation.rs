//! The trait a game implements to be driven by the sync layer.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Pure hooks over a cloneable game state.
///
/// Both ends call exactly these two functions, in the same order, so any
/// implementation that is deterministic in `(state, input)` stays in
/// agreement across the network. Cloning is `State: Clone`.
///
/// # Example
///
/// ```ignore
/// struct Counter;
///
/// impl Simulation for Counter {
///     type State = i64;
///     type Input = i64;
///     type Outcome = ();
///
///     fn apply_input(state: &mut i64, delta: &i64) { *state += delta; }
///     fn simulate(_state: &mut i64) {}
/// }
/// ```
pub trait Simulation {
    /// A complete, self-contained snapshot.
    type State: Clone + Debug + Serialize + DeserializeOwned + Send + 'static;

    /// One player action.
    type Input: Clone + Debug + Serialize + DeserializeOwned + Send + 'static;

    /// What a single step reports back, e.g. whether the game ended.
    type Outcome;

    /// Folds one input into the state. Inputs that make no sense in the
    /// current state should be ignored, not reported.
    fn apply_input(state: &mut Self::State, input: &Self::Input);

    /// Advances the state by exactly one tick.
    fn simulate(state: &mut Self::State) -> Self::Outcome;
}
