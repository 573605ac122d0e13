// src/event/queue.rs

//! FIFO event queue shared between producers and the single consumer.
//!
//! Capacity policy is fixed at construction:
//! - `RejectNewest` (default): a push into a full queue fails with
//!   `ResourceExhausted` and leaves the queue untouched.
//! - `DropOldest`: the head is discarded to make room.
//! - `Unbounded`: the queue grows without limit.
//!
//! Both bounded policies bump the overflow counter. Neither reorders the
//! events that remain.

use super::{Event, EventType};
use crate::error::{Error, Result};
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Default bound on queued events.
pub const DEFAULT_CAPACITY: usize = 128;

/// What happens when a bounded queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    DropOldest,
    #[default]
    RejectNewest,
    Unbounded,
}

/// Per-type processing state, also used as a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// Report the current state without changing it.
    Query,
    Enable,
    Ignore,
}

#[derive(Debug)]
pub struct EventQueue {
    events: Mutex<VecDeque<Event>>,
    capacity: usize,
    policy: OverflowPolicy,
    /// Bit `n` set means event type id `n` is ignored.
    ignored: AtomicU32,
    overflows: AtomicU64,
}

impl Default for EventQueue {
    fn default() -> Self {
        EventQueue::new(DEFAULT_CAPACITY, OverflowPolicy::default())
    }
}

impl EventQueue {
    /// A zero capacity with a bounded policy is raised to one.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = match policy {
            OverflowPolicy::Unbounded => usize::MAX,
            _ => capacity.max(1),
        };
        let initial = if capacity == usize::MAX { DEFAULT_CAPACITY } else { capacity };
        EventQueue {
            events: Mutex::new(VecDeque::with_capacity(initial)),
            capacity,
            policy,
            ignored: AtomicU32::new(0),
            overflows: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// `None` for an unbounded queue.
    pub fn capacity(&self) -> Option<usize> {
        match self.policy {
            OverflowPolicy::Unbounded => None,
            _ => Some(self.capacity),
        }
    }

    /// Appends `event` at the tail. Never waits on the consumer.
    pub fn push(&self, event: Event) -> Result<()> {
        let ty = event.event_type();
        if !self.is_enabled(ty) {
            trace!("EventQueue: discarding ignored {:?}", ty);
            return Ok(());
        }
        let mut events = self.lock();
        if events.len() >= self.capacity {
            let total = self.overflows.fetch_add(1, Ordering::Relaxed) + 1;
            match self.policy {
                OverflowPolicy::DropOldest => {
                    let dropped = events.pop_front();
                    warn!(
                        "EventQueue: full ({} events), dropped oldest {:?} (overflows={})",
                        self.capacity,
                        dropped.as_ref().map(Event::event_type),
                        total
                    );
                }
                OverflowPolicy::RejectNewest | OverflowPolicy::Unbounded => {
                    warn!(
                        "EventQueue: full ({} events), rejected {:?} (overflows={})",
                        self.capacity, ty, total
                    );
                    return Err(Error::ResourceExhausted(format!(
                        "event queue is full ({} events)",
                        self.capacity
                    )));
                }
            }
        }
        events.push_back(event);
        Ok(())
    }

    /// Dequeues the head, or `None` if the queue is empty.
    pub fn poll(&self) -> Option<Event> {
        self.lock().pop_front()
    }

    /// Copy of the head without removing it.
    pub fn peek(&self) -> Option<Event> {
        self.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every queued event.
    pub fn clear(&self) -> usize {
        let mut events = self.lock();
        let dropped = events.len();
        events.clear();
        dropped
    }

    /// Number of pushes that hit a full queue.
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self, ty: EventType) -> bool {
        self.ignored.load(Ordering::Acquire) & type_bit(ty) == 0
    }

    /// Enables or ignores `ty`, returning the state before the call.
    /// Ignoring a type also removes any queued events of that type.
    pub fn set_event_state(&self, ty: EventType, state: EventState) -> EventState {
        let bit = type_bit(ty);
        let previous = match state {
            EventState::Query => self.ignored.load(Ordering::Acquire),
            EventState::Enable => self.ignored.fetch_and(!bit, Ordering::AcqRel),
            EventState::Ignore => {
                let previous = self.ignored.fetch_or(bit, Ordering::AcqRel);
                self.lock().retain(|event| event.event_type() != ty);
                previous
            }
        };
        if previous & bit == 0 {
            EventState::Enable
        } else {
            EventState::Ignore
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn type_bit(ty: EventType) -> u32 {
    1u32 << ty.id()
}
