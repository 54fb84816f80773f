//! Per-element dispatch bookkeeping: concurrency policy and staleness.
//!
//! Each requesting element owns a slot of monotonically increasing
//! generations. A response is applied only if its generation is still
//! valid when it lands; [`Dispatcher::abort`] invalidates everything
//! outstanding for an element (used when it leaves the document).

use slotmap::SecondaryMap;

use super::descriptor::ConcurrencyMode;
use crate::dom::NodeId;

/// What `begin` decided for a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Dispatch now, stamped with this generation.
    Dispatched(u64),
    /// An earlier request is in flight and the policy drops repeats.
    Dropped,
    /// An earlier request is in flight; one re-dispatch is remembered.
    Queued,
}

/// What `complete` decided for a settled response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The response's generation was invalidated while in flight; its
    /// body must not be applied.
    pub stale: bool,
    /// A queued trigger is waiting; the caller should dispatch again.
    pub requeue: bool,
}

#[derive(Debug, Default)]
struct Slot {
    /// Generation stamped on the next dispatch.
    next_generation: u64,
    /// Generations below this were invalidated by an abort.
    min_valid: u64,
    in_flight: usize,
    /// Collapsed queue-latest marker; never more than one.
    queued: bool,
}

/// Dispatch state for every requesting element in one document.
#[derive(Debug, Default)]
pub struct Dispatcher {
    mode: ConcurrencyMode,
    slots: SecondaryMap<NodeId, Slot>,
}

impl Dispatcher {
    pub fn new(mode: ConcurrencyMode) -> Self {
        Dispatcher {
            mode,
            slots: SecondaryMap::new(),
        }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Decide whether a trigger on `node` dispatches now.
    pub fn begin(&mut self, node: NodeId) -> DispatchOutcome {
        let Some(slot) = self.slots.entry(node).map(|entry| entry.or_default()) else {
            // The node id is no longer valid in the arena.
            return DispatchOutcome::Dropped;
        };
        if slot.in_flight > 0 {
            match self.mode {
                ConcurrencyMode::DropIfPending => return DispatchOutcome::Dropped,
                ConcurrencyMode::QueueLatest => {
                    slot.queued = true;
                    return DispatchOutcome::Queued;
                }
                ConcurrencyMode::AllowConcurrent => {}
            }
        }
        let generation = slot.next_generation;
        slot.next_generation += 1;
        slot.in_flight += 1;
        DispatchOutcome::Dispatched(generation)
    }

    /// Record that the request stamped `generation` has settled.
    pub fn complete(&mut self, node: NodeId, generation: u64) -> Completion {
        let Some(slot) = self.slots.get_mut(node) else {
            // The slot was already dropped; nothing outstanding is valid.
            return Completion {
                stale: true,
                requeue: false,
            };
        };
        slot.in_flight = slot.in_flight.saturating_sub(1);
        let stale = generation < slot.min_valid;
        let requeue = slot.in_flight == 0 && std::mem::take(&mut slot.queued);
        // An aborted slot has min_valid caught up to next_generation; once
        // its last response drains there is nothing left to track.
        if slot.in_flight == 0 && slot.min_valid == slot.next_generation {
            self.slots.remove(node);
        }
        Completion { stale, requeue }
    }

    /// Invalidate everything outstanding for `node`. The slot survives
    /// while responses are still in flight so their generations compare
    /// stale when they land; an idle slot is forgotten outright.
    pub fn abort(&mut self, node: NodeId) {
        let Some(slot) = self.slots.get_mut(node) else {
            return;
        };
        slot.queued = false;
        if slot.in_flight == 0 {
            self.slots.remove(node);
        } else {
            slot.min_valid = slot.next_generation;
        }
    }

    /// Whether a response stamped `generation` must be discarded.
    pub fn is_stale(&self, node: NodeId, generation: u64) -> bool {
        self.slots
            .get(node)
            .map_or(true, |slot| generation < slot.min_valid)
    }

    pub fn in_flight(&self, node: NodeId) -> usize {
        self.slots.get(node).map_or(0, |slot| slot.in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Dom, NodeData};

    fn node() -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let id = dom.insert(NodeData::element("button"));
        (dom, id)
    }

    #[test]
    fn drop_if_pending_ignores_repeat_triggers() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::DropIfPending);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(0));
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dropped);
        assert_eq!(dispatcher.in_flight(id), 1);

        let completion = dispatcher.complete(id, 0);
        assert!(!completion.stale);
        assert!(!completion.requeue);
        // Settled; the next trigger dispatches again.
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(1));
    }

    #[test]
    fn queue_latest_collapses_to_one_redispatch() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::QueueLatest);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(0));
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Queued);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Queued);

        let completion = dispatcher.complete(id, 0);
        assert!(completion.requeue);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(1));
        // The queue marker was consumed; settling now requeues nothing.
        let completion = dispatcher.complete(id, 1);
        assert!(!completion.requeue);
    }

    #[test]
    fn allow_concurrent_races_generations() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::AllowConcurrent);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(0));
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(1));
        assert_eq!(dispatcher.in_flight(id), 2);
        assert!(!dispatcher.complete(id, 1).stale);
        assert!(!dispatcher.complete(id, 0).stale);
    }

    #[test]
    fn abort_invalidates_outstanding_generations() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::DropIfPending);
        let DispatchOutcome::Dispatched(generation) = dispatcher.begin(id) else {
            panic!("first trigger should dispatch");
        };
        dispatcher.abort(id);
        assert!(dispatcher.is_stale(id, generation));
        let completion = dispatcher.complete(id, generation);
        assert!(completion.stale);
    }

    #[test]
    fn abort_spares_generations_dispatched_afterwards() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::AllowConcurrent);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(0));
        dispatcher.abort(id);
        // The old response is invalid, but a fresh dispatch is not.
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Dispatched(1));
        assert!(dispatcher.is_stale(id, 0));
        assert!(!dispatcher.is_stale(id, 1));
        assert!(dispatcher.complete(id, 0).stale);
        assert!(!dispatcher.complete(id, 1).stale);
    }

    #[test]
    fn drained_aborted_slot_is_forgotten() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::DropIfPending);
        dispatcher.begin(id);
        dispatcher.abort(id);
        assert_eq!(dispatcher.in_flight(id), 1);
        dispatcher.complete(id, 0);
        // With the slot gone, anything it once stamped reads stale.
        assert_eq!(dispatcher.in_flight(id), 0);
        assert!(dispatcher.is_stale(id, 0));
    }

    #[test]
    fn abort_clears_queue_marker() {
        let (_dom, id) = node();
        let mut dispatcher = Dispatcher::new(ConcurrencyMode::QueueLatest);
        dispatcher.begin(id);
        assert_eq!(dispatcher.begin(id), DispatchOutcome::Queued);
        dispatcher.abort(id);
        let completion = dispatcher.complete(id, 0);
        assert!(completion.stale);
        assert!(!completion.requeue);
    }
}
