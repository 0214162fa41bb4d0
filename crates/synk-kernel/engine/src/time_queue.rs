// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Time-ordered event queue
//!
//! Min-heap on delivery time; equal times pop in insertion order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use synk_kernel_mechanism::EventRecord;

use crate::error::{EngineError, Result};

/// Destination for drained self-events
pub trait SelfEventSink {
    fn schedule(&mut self, event: EventRecord) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    time: f64,
    seq: u64,
    event: EventRecord,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimeQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl TimeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.time)
    }

    /// Remove every event with `time <= t`, earliest first
    pub fn pop_due(&mut self, t: f64) -> Vec<EventRecord> {
        let mut due = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.time > t {
                break;
            }
            if let Some(entry) = self.heap.pop() {
                due.push(entry.event);
            }
        }
        due
    }

    /// Remove the events sharing the earliest time, if that time is `<= t`
    pub fn pop_earliest(&mut self, t: f64) -> Vec<EventRecord> {
        let earliest = match self.peek_time() {
            Some(time) if time <= t => time,
            _ => return Vec::new(),
        };
        self.pop_due(earliest)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl SelfEventSink for TimeQueue {
    fn schedule(&mut self, event: EventRecord) -> Result<()> {
        if !event.time.is_finite() {
            return Err(EngineError::InvalidEventTime(event.time));
        }
        self.heap.push(Entry {
            time: event.time,
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
        Ok(())
    }
}

impl SelfEventSink for Vec<EventRecord> {
    fn schedule(&mut self, event: EventRecord) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synk_kernel_mechanism::{InstanceId, WeightIndex};

    fn ev(instance: u32, time: f64) -> EventRecord {
        EventRecord::activation(InstanceId(instance), WeightIndex(0), time)
    }

    #[test]
    fn test_pops_in_time_order_with_fifo_ties() {
        let mut q = TimeQueue::new();
        q.schedule(ev(0, 0.4)).unwrap();
        q.schedule(ev(1, 0.1)).unwrap();
        q.schedule(ev(2, 0.4)).unwrap();
        q.schedule(ev(3, 0.2)).unwrap();
        assert_eq!(q.peek_time(), Some(0.1));

        let due: Vec<u32> = q.pop_due(0.4).iter().map(|e| e.instance.0).collect();
        assert_eq!(due, vec![1, 3, 0, 2]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_never_delivers_early() {
        let mut q = TimeQueue::new();
        q.schedule(ev(0, 1.0)).unwrap();
        assert!(q.pop_due(0.999).is_empty());
        assert_eq!(q.pop_due(1.0).len(), 1);
    }

    #[test]
    fn test_pop_earliest_takes_one_timestamp() {
        let mut q = TimeQueue::new();
        q.schedule(ev(0, 0.3)).unwrap();
        q.schedule(ev(1, 0.1)).unwrap();
        q.schedule(ev(2, 0.1)).unwrap();

        let first: Vec<u32> = q.pop_earliest(0.5).iter().map(|e| e.instance.0).collect();
        assert_eq!(first, vec![1, 2]);
        assert!(q.pop_earliest(0.2).is_empty());
        assert_eq!(q.pop_earliest(0.5).len(), 1);
        assert!(q.pop_earliest(0.5).is_empty());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut q = TimeQueue::new();
        assert!(q.schedule(ev(0, f64::INFINITY)).is_err());
    }
}
