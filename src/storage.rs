use crate::event::Event;

use log::trace;
use noisy_float::prelude::*;

/// Arena of pushed events
///
/// Each event occupies the slot with the index equal to its id. Ids
/// are assigned sequentially and never reused. An event passes
/// through three stages: *surviving* after push, *consumed* once a
/// resampling pass has merged it into a cell, and finally *drained*
/// when its weights have been retrieved, which releases the slot.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    slots: Vec<Option<Event>>,
    consumed: Vec<bool>,
    // consumed event ids in cell finalization order, drained from the back
    drain_order: Vec<usize>,
}

impl EventStore {
    /// An empty event store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve space for `cap` additional events
    pub fn reserve(&mut self, cap: usize) {
        self.slots.reserve(cap);
        self.consumed.reserve(cap);
    }

    /// Add an event, returning its assigned id
    pub fn push(&mut self, mut event: Event) -> usize {
        let id = self.slots.len();
        event.set_id(id);
        self.slots.push(Some(event));
        self.consumed.push(false);
        id
    }

    /// Access a stored event
    ///
    /// Ids handed out by [push](Self::push) are valid until the event
    /// is drained.
    pub fn event(&self, id: usize) -> &Event {
        self.slots[id].as_ref().expect("event already drained")
    }

    /// Check whether the given id refers to a surviving event
    pub fn is_surviving(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(|s| s.is_some()) && !self.consumed[id]
    }

    /// Ids of all surviving events, in push order
    pub fn surviving(&self) -> Vec<usize> {
        (0..self.slots.len())
            .filter(|&id| self.is_surviving(id))
            .collect()
    }

    /// The number of surviving events
    pub fn n_surviving(&self) -> usize {
        (0..self.slots.len()).filter(|&id| self.is_surviving(id)).count()
    }

    /// The total number of events pushed so far
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no events were ever pushed
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Mark the members of a finalized cell as consumed
    ///
    /// The members enter the drain queue in the given order. Cells
    /// committed later drain earlier.
    pub fn commit_cell(&mut self, members: &[usize]) {
        for &id in members {
            debug_assert!(self.is_surviving(id));
            self.consumed[id] = true;
        }
        self.drain_order.extend_from_slice(members);
    }

    /// Retrieve the weights of the next consumed event
    ///
    /// Events drain in reverse order of cell finalization. Draining
    /// releases the event slot, so each event's weights can be
    /// retrieved at most once. Returns `None` once all consumed
    /// events have been drained.
    pub fn next_weights(&mut self) -> Option<Vec<N64>> {
        let id = self.drain_order.pop()?;
        let event = self.slots[id].take().expect("drained event id queued twice");
        trace!("draining event {id}");
        Some(event.weights.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBuilder;

    use particle_id::ParticleID;

    const JET: ParticleID = ParticleID::new(81);

    fn event(weight: f64) -> Event {
        let mut ev = EventBuilder::new();
        ev.add_weight(n64(weight));
        ev.add_outgoing(JET, [10., 0., 0., 10.].into());
        ev.build()
    }

    #[test]
    fn push_assigns_sequential_ids() {
        let mut store = EventStore::new();
        for n in 0..4 {
            let id = store.push(event(n as f64));
            assert_eq!(id, n);
            assert_eq!(store.event(id).id(), n);
        }
        assert_eq!(store.surviving(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn drain_reverses_finalization_order() {
        let mut store = EventStore::new();
        for n in 0..4 {
            store.push(event(n as f64));
        }
        store.commit_cell(&[0, 2]);
        store.commit_cell(&[3, 1]);
        assert_eq!(store.surviving(), Vec::<usize>::new());
        // later cell first, members join-reversed within each cell
        assert_eq!(store.next_weights(), Some(vec![n64(1.)]));
        assert_eq!(store.next_weights(), Some(vec![n64(3.)]));
        assert_eq!(store.next_weights(), Some(vec![n64(2.)]));
        assert_eq!(store.next_weights(), Some(vec![n64(0.)]));
        assert_eq!(store.next_weights(), None);
    }

    #[test]
    fn survivors_exclude_consumed_and_drained() {
        let mut store = EventStore::new();
        for n in 0..3 {
            store.push(event(n as f64));
        }
        store.commit_cell(&[1]);
        assert_eq!(store.surviving(), vec![0, 2]);
        assert!(!store.is_surviving(1));
        let _ = store.next_weights();
        assert_eq!(store.surviving(), vec![0, 2]);
        assert_eq!(store.next_weights(), None);
    }
}
