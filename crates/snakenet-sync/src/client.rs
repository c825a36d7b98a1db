//! The predicting side of the protocol.

use std::marker::PhantomData;

use crate::{InputPacket, Simulation, StatePacket, SyncError};

/// A locally predicted copy of one player's state.
///
/// Inputs take effect immediately and are kept until the server
/// acknowledges them. Each [`StatePacket`] snaps the state back to the
/// server's truth and replays whatever is still unacknowledged on top.
pub struct PredictionClient<S: Simulation> {
    state: S::State,
    current_tick: u64,
    next_input_id: u64,
    /// Ascending by `input_id`.
    pending: Vec<InputPacket<S::Input>>,
    max_pending: usize,
    _sim: PhantomData<S>,
}

impl<S: Simulation> PredictionClient<S> {
    /// Starts predicting from `state` at tick 0.
    ///
    /// `max_pending` bounds the number of unacknowledged inputs; at the
    /// limit [`submit_input`](Self::submit_input) refuses new ones.
    pub fn new(state: S::State, max_pending: usize) -> Self {
        Self::starting_at(state, 0, max_pending)
    }

    /// Starts predicting from `state`, which the server had already
    /// stepped to `tick`.
    pub fn starting_at(state: S::State, tick: u64, max_pending: usize) -> Self {
        Self {
            state,
            current_tick: tick,
            next_input_id: 1,
            pending: Vec::new(),
            max_pending,
            _sim: PhantomData,
        }
    }

    /// Applies `input` to the predicted state and returns the packet to
    /// send.
    ///
    /// # Errors
    /// [`SyncError::Backlogged`] if `max_pending` inputs are still
    /// unacknowledged. The input is not applied.
    pub fn submit_input(&mut self, input: S::Input) -> Result<InputPacket<S::Input>, SyncError> {
        if self.pending.len() >= self.max_pending {
            return Err(SyncError::Backlogged {
                pending: self.pending.len(),
                limit: self.max_pending,
            });
        }

        let packet = InputPacket {
            tick: self.current_tick,
            input_id: self.next_input_id,
            payload: input,
        };
        self.next_input_id += 1;

        S::apply_input(&mut self.state, &packet.payload);
        self.pending.push(packet.clone());
        Ok(packet)
    }

    /// Steps the prediction forward one tick without waiting for the
    /// server.
    pub fn advance_tick(&mut self) -> S::Outcome {
        self.current_tick += 1;
        S::simulate(&mut self.state)
    }

    /// Reconciles against the server's state.
    ///
    /// Drops every acknowledged input, snaps state and tick to the
    /// packet, then re-applies the remaining pending inputs in order. No
    /// simulation steps are replayed; see
    /// [`fast_forward`](Self::fast_forward) for that.
    pub fn on_server_state(&mut self, packet: StatePacket<S::State>) {
        if let Some(acked) = packet.last_processed_input_id {
            self.pending.retain(|p| p.input_id > acked);
        }

        self.state = packet.state;
        self.current_tick = packet.tick;

        for input in &self.pending {
            S::apply_input(&mut self.state, &input.payload);
        }
        tracing::trace!(
            tick = self.current_tick,
            replayed = self.pending.len(),
            "reconciled with server state"
        );
    }

    /// Simulates until the local tick reaches `tick`. Returns the number
    /// of steps taken; zero if already there or ahead.
    pub fn fast_forward(&mut self, tick: u64) -> u64 {
        let mut steps = 0;
        while self.current_tick < tick {
            let _ = self.advance_tick();
            steps += 1;
        }
        steps
    }

    pub fn state(&self) -> &S::State {
        &self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Inputs sent but not yet acknowledged, oldest first.
    pub fn pending_inputs(&self) -> &[InputPacket<S::Input>] {
        &self.pending
    }
}

// =========================================================================
// Tests
// =========================================================================
