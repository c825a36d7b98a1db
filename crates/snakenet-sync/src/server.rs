//! The authoritative side of the protocol.

use std::collections::HashSet;
use std::marker::PhantomData;

use crate::{InputPacket, Simulation, StatePacket};

/// An input waiting for its tick.
#[derive(Debug, Clone)]
struct Scheduled<I> {
    tick: u64,
    input_id: u64,
    payload: I,
}

/// The authoritative copy of one player's state.
///
/// Inputs are queued against the tick they were made at. Inputs for a
/// tick that has already passed are moved to the current tick rather than
/// dropped, and inputs further ahead than the horizon are pulled back to
/// it, so every accepted input eventually takes effect. Within a tick
/// inputs apply in arrival order.
pub struct AuthorityServer<S: Simulation> {
    state: S::State,
    current_tick: u64,
    queue: Vec<Scheduled<S::Input>>,
    queued_ids: HashSet<u64>,
    last_processed_input_id: Option<u64>,
    horizon_ticks: u64,
    max_queued: usize,
    _sim: PhantomData<S>,
}

impl<S: Simulation> AuthorityServer<S> {
    /// How far ahead of the current tick an input may be scheduled.
    pub const DEFAULT_HORIZON_TICKS: u64 = 64;
    /// How many inputs may wait at once.
    pub const DEFAULT_MAX_QUEUED: usize = 256;

    pub fn new(state: S::State) -> Self {
        Self::with_limits(state, Self::DEFAULT_HORIZON_TICKS, Self::DEFAULT_MAX_QUEUED)
    }

    /// Like [`new`](Self::new) with an explicit scheduling horizon and
    /// queue bound.
    pub fn with_limits(state: S::State, horizon_ticks: u64, max_queued: usize) -> Self {
        Self {
            state,
            current_tick: 0,
            queue: Vec::new(),
            queued_ids: HashSet::new(),
            last_processed_input_id: None,
            horizon_ticks,
            max_queued,
            _sim: PhantomData,
        }
    }

    /// Queues a client input. Returns `false` if it was refused: an id
    /// already processed or already queued, or the queue is full.
    pub fn on_client_input(&mut self, packet: InputPacket<S::Input>) -> bool {
        let already_processed = self
            .last_processed_input_id
            .is_some_and(|last| packet.input_id <= last);
        if already_processed || self.queued_ids.contains(&packet.input_id) {
            tracing::debug!(input_id = packet.input_id, "dropping duplicate input");
            return false;
        }
        if self.queue.len() >= self.max_queued {
            tracing::warn!(
                input_id = packet.input_id,
                limit = self.max_queued,
                "input queue full, dropping input"
            );
            return false;
        }

        let horizon = self.current_tick.saturating_add(self.horizon_ticks);
        let tick = if packet.tick < self.current_tick {
            tracing::trace!(
                input_id = packet.input_id,
                requested = packet.tick,
                current = self.current_tick,
                "late input rescheduled"
            );
            self.current_tick
        } else if packet.tick > horizon {
            tracing::debug!(
                input_id = packet.input_id,
                requested = packet.tick,
                horizon,
                "far-future input pulled back to horizon"
            );
            horizon
        } else {
            packet.tick
        };

        self.queued_ids.insert(packet.input_id);
        self.queue.push(Scheduled {
            tick,
            input_id: packet.input_id,
            payload: packet.payload,
        });
        true
    }

    /// Applies the inputs due this tick, steps once, and returns the
    /// state to broadcast with the step's outcome.
    pub fn advance_tick(&mut self) -> (StatePacket<S::State>, S::Outcome) {
        let current = self.current_tick;
        let (due, later): (Vec<_>, Vec<_>) =
            self.queue.drain(..).partition(|s| s.tick <= current);
        self.queue = later;

        for input in due {
            self.queued_ids.remove(&input.input_id);
            S::apply_input(&mut self.state, &input.payload);
            self.last_processed_input_id = Some(
                self.last_processed_input_id
                    .map_or(input.input_id, |last| last.max(input.input_id)),
            );
        }

        let outcome = S::simulate(&mut self.state);
        self.current_tick += 1;

        let packet = StatePacket {
            tick: self.current_tick,
            last_processed_input_id: self.last_processed_input_id,
            state: self.state.clone(),
        };
        (packet, outcome)
    }

    pub fn state(&self) -> &S::State {
        &self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn last_processed_input_id(&self) -> Option<u64> {
        self.last_processed_input_id
    }

    /// Number of inputs waiting for a future tick.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    /// Records every input it sees, in order.
    struct Log;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Entries {
        seen: Vec<(u64, char)>,
        ticks: u64,
    }

    impl Simulation for Log {
        type State = Entries;
        type Input = char;
        type Outcome = ();

        fn apply_input(state: &mut Entries, c: &char) {
            state.seen.push((state.ticks, *c));
        }

        fn simulate(state: &mut Entries) {
            state.ticks += 1;
        }
    }

    fn packet(tick: u64, input_id: u64, c: char) -> InputPacket<char> {
        InputPacket {
            tick,
            input_id,
            payload: c,
        }
    }

    #[test]
    fn test_advance_tick_applies_due_inputs_then_steps() {
        let mut server = AuthorityServer::<Log>::new(Entries::default());
        assert!(server.on_client_input(packet(0, 1, 'a')));
        let (state, ()) = server.advance_tick();
        assert_eq!(state.tick, 1);
        assert_eq!(state.last_processed_input_id, Some(1));
        assert_eq!(state.state.seen, vec![(0, 'a')]);
    }

    #[test]
    fn test_on_client_input_future_waits_for_its_tick() {
        let mut server = AuthorityServer::<Log>::new(Entries::default());
        server.on_client_input(packet(2, 1, 'f'));
        let (first, ()) = server.advance_tick();
        assert!(first.state.seen.is_empty());
        assert_eq!(first.last_processed_input_id, None);
        let _ = server.advance_tick();
        let (third, ()) = server.advance_tick();
        assert_eq!(third.state.seen, vec![(2, 'f')]);
        assert_eq!(server.queued(), 0);
    }

    #[test]
    fn test_on_client_input_late_is_applied_now() {
        let mut server = AuthorityServer::<Log>::new(Entries::default());
        for _ in 0..5 {
            let _ = server.advance_tick();
        }
        assert!(server.on_client_input(packet(1, 1, 'l')));
        let (state, ()) = server.advance_tick();
        assert_eq!(state.state.seen, vec![(5, 'l')]);
    }

    #[test]
    fn test_on_client_input_same_tick_keeps_arrival_order() {
        let mut server = AuthorityServer::<Log>::new(Entries::default());
        server.on_client_input(packet(0, 2, 'b'));
        server.on_client_input(packet(0, 1, 'a'));
        let (state, ()) = server.advance_tick();
        assert_eq!(state.state.seen, vec![(0, 'b'), (0, 'a')]);
        assert_eq!(state.last_processed_input_id, Some(2));
    }

    #[test]
    fn test_on_client_input_duplicates_are_dropped() {
        let mut server = AuthorityServer::<Log>::new(Entries::default());
        assert!(server.on_client_input(packet(0, 1, 'a')));
        assert!(!server.on_client_input(packet(0, 1, 'a')), "already queued");
        let _ = server.advance_tick();
        assert!(!server.on_client_input(packet(1, 1, 'a')), "already processed");
        let (state, ()) = server.advance_tick();
        assert_eq!(state.state.seen.len(), 1);
    }

    #[test]
    fn test_on_client_input_far_future_is_applied_at_horizon() {
        let mut server = AuthorityServer::<Log>::with_limits(Entries::default(), 3, 16);
        assert!(server.on_client_input(packet(u64::MAX, 1, 'x')));
        for _ in 0..3 {
            let (state, ()) = server.advance_tick();
            assert!(state.state.seen.is_empty());
        }
        let (state, ()) = server.advance_tick();
        assert_eq!(state.state.seen, vec![(3, 'x')]);
        assert_eq!(state.last_processed_input_id, Some(1));
        assert_eq!(server.queued(), 0);
    }

    #[test]
    fn test_on_client_input_full_queue_refuses_until_drained() {
        let mut server = AuthorityServer::<Log>::with_limits(Entries::default(), 64, 4);
        for id in 1..=4 {
            assert!(server.on_client_input(packet(u64::MAX, id, 'q')));
        }
        assert!(!server.on_client_input(packet(0, 5, 'r')));
        assert_eq!(server.queued(), 4);

        for _ in 0..=64 {
            let _ = server.advance_tick();
        }
        assert_eq!(server.queued(), 0);
        assert!(server.on_client_input(packet(0, 6, 'r')));
    }

    #[test]
    fn test_on_client_input_flood_never_outgrows_queue() {
        let mut server = AuthorityServer::<Log>::new(Entries::default());
        for id in 1..=20_000 {
            server.on_client_input(packet(u64::MAX, id, 'f'));
        }
        assert_eq!(server.queued(), AuthorityServer::<Log>::DEFAULT_MAX_QUEUED);
        for _ in 0..100 {
            let _ = server.advance_tick();
        }
        assert_eq!(server.queued(), 0);
    }
}
