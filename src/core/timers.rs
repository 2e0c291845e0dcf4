//! Single-shot deferred callbacks keyed by simulated time
//!
//! Callbacks are kept in a min-heap and drained once per tick. A keyed
//! callback is replaced (and so cancelled) when the same key is scheduled
//! again, which is how a flag reset is pushed back by a new reset request.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::types::{EntityId, ObjectiveId, SimTime};

/// A deferred callback over the owning context
pub type Callback<Ctx> = Box<dyn FnOnce(&mut Ctx)>;

/// Identity of a cancellable timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    FlagReset(ObjectiveId),
    Respawn(EntityId),
}

struct Scheduled<Ctx> {
    key: Option<TimerKey>,
    callback: Callback<Ctx>,
}

/// Min-heap of scheduled closures
pub struct DeferredQueue<Ctx> {
    heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64)>>,
    pending: AHashMap<u64, Scheduled<Ctx>>,
    keyed: AHashMap<TimerKey, u64>,
    next_seq: u64,
}

impl<Ctx> Default for DeferredQueue<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> DeferredQueue<Ctx> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: AHashMap::new(),
            keyed: AHashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule an anonymous callback to fire at `at`
    pub fn schedule(&mut self, at: SimTime, callback: Callback<Ctx>) -> u64 {
        self.push(None, at, callback)
    }

    /// Schedule a callback under `key`, cancelling any earlier one with the same key
    pub fn schedule_keyed(&mut self, key: TimerKey, at: SimTime, callback: Callback<Ctx>) -> u64 {
        self.cancel(key);
        self.push(Some(key), at, callback)
    }

    /// Cancel the pending callback for `key`. Returns true if one was pending.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.keyed.remove(&key) {
            // Heap entry stays behind and is skipped when popped
            Some(seq) => self.pending.remove(&seq).is_some(),
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: TimerKey) -> bool {
        self.keyed.contains_key(&key)
    }

    /// Number of live (not cancelled, not fired) callbacks
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every callback due at or before `now`, earliest first
    pub fn take_due(&mut self, now: SimTime) -> Vec<Callback<Ctx>> {
        let mut due = Vec::new();

        while let Some(Reverse((at, seq))) = self.heap.peek().copied() {
            if at.into_inner() > now {
                break;
            }
            self.heap.pop();

            if let Some(scheduled) = self.pending.remove(&seq) {
                if let Some(key) = scheduled.key {
                    self.keyed.remove(&key);
                }
                due.push(scheduled.callback);
            }
        }

        due
    }

    fn push(&mut self, key: Option<TimerKey>, at: SimTime, callback: Callback<Ctx>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(Reverse((OrderedFloat(at), seq)));
        self.pending.insert(seq, Scheduled { key, callback });
        if let Some(key) = key {
            self.keyed.insert(key, seq);
        }
        seq
    }
}
