//! Generic binary-heap event queue, grounded on the teacher's
//! `simulation::event_queue` (originally keyed on `chrono::NaiveDateTime` for
//! its simulator harness). Relocated into `dispatch` and generalized over the
//! time representation: the evaluator's inner loop (spec.md §4.4) keys events
//! by plain `i64` seconds to stay allocation-light (spec.md §9).

use std::{cmp::Reverse, collections::BinaryHeap};

pub trait Event {
    type Time: Ord + Copy;

    fn time(&self) -> Self::Time;

    fn time_rev(&self) -> Reverse<Self::Time> {
        Reverse(self.time())
    }
}

#[derive(Debug, Clone)]
struct EventWrapper<E: Event>(E);

impl<E: Event> PartialEq for EventWrapper<E> {
    fn eq(&self, other: &Self) -> bool {
        self.0.time_rev() == other.0.time_rev()
    }
}

impl<E: Event> PartialOrd for EventWrapper<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Event> Eq for EventWrapper<E> {}
impl<E: Event> Ord for EventWrapper<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.time_rev().cmp(&other.0.time_rev())
    }
}

#[derive(Debug, Clone)]
pub struct EventQueue<E: Event> {
    events: BinaryHeap<EventWrapper<E>>,
}

impl<E: Event> EventQueue<E> {
    pub fn new() -> EventQueue<E> {
        EventQueue {
            events: BinaryHeap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> EventQueue<E> {
        EventQueue {
            events: BinaryHeap::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: E) {
        self.events.push(EventWrapper(event));
    }

    pub fn pop(&mut self) -> Option<E> {
        self.events.pop().map(|EventWrapper(e)| e)
    }

    pub fn peek(&self) -> Option<&E> {
        self.events.peek().map(|EventWrapper(e)| e)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl<E: Event> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
