// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Net Receive Buffer
//!
//! Collects deliveries from any number of concurrent producers and hands
//! them to the flush phase grouped by target instance.
//!
//! ## Enqueue
//!
//! ```text
//! slot = cnt.fetch_add(1)          (unique reservation)
//! read lock:  slot < len  ─► write record into slot
//!             slot >= len ─► drop read lock
//!                            write lock (waits for in-flight writers)
//!                            double len until slot < len
//!                            read lock, write record
//! ```
//!
//! Storage is only reallocated under the write lock, so it never moves while
//! another producer is writing into a reserved slot.
//!
//! ## Flush
//!
//! `drain_grouped` stable-sorts the records by target instance and builds a
//! displacement array: run `k` is `events[displ[k]..displ[k + 1]]`. Within a
//! run records keep their reservation order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;
use synk_kernel_mechanism::{EventRecord, InstanceId};
use tracing::warn;

use crate::error::{EngineError, Result};

pub const DEFAULT_RECEIVE_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct NetReceiveBuffer {
    slots: RwLock<Vec<OnceLock<EventRecord>>>,
    cnt: AtomicUsize,
    growths: AtomicUsize,
}

/// Drained records grouped into per-instance runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedEvents {
    events: Vec<EventRecord>,
    displ: Vec<usize>,
}

impl GroupedEvents {
    /// Group `events` by target instance, keeping arrival order within each run
    pub fn from_events(mut events: Vec<EventRecord>) -> Self {
        events.sort_by_key(|e| e.instance);
        let mut displ = Vec::new();
        let mut current: Option<InstanceId> = None;
        for (i, e) in events.iter().enumerate() {
            if current != Some(e.instance) {
                displ.push(i);
                current = Some(e.instance);
            }
        }
        displ.push(events.len());
        Self { events, displ }
    }

    pub fn run_count(&self) -> usize {
        self.displ.len().saturating_sub(1)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn displacements(&self) -> &[usize] {
        &self.displ
    }

    pub fn run(&self, k: usize) -> &[EventRecord] {
        &self.events[self.displ[k]..self.displ[k + 1]]
    }

    pub fn runs(&self) -> impl Iterator<Item = &[EventRecord]> {
        self.displ.windows(2).map(move |w| &self.events[w[0]..w[1]])
    }

    pub fn runs_vec(&self) -> Vec<&[EventRecord]> {
        self.runs().collect()
    }
}

impl NetReceiveBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: RwLock::new((0..capacity).map(|_| OnceLock::new()).collect()),
            cnt: AtomicUsize::new(0),
            growths: AtomicUsize::new(0),
        }
    }

    /// Append a record; safe to call from many threads at once
    pub fn enqueue(&self, record: EventRecord) -> Result<()> {
        if !record.time.is_finite() {
            return Err(EngineError::InvalidEventTime(record.time));
        }
        let slot = self.cnt.fetch_add(1, Ordering::AcqRel);
        {
            let slots = self.slots.read();
            if slot < slots.len() {
                return slots[slot]
                    .set(record)
                    .map_err(|_| EngineError::BufferSlotCorrupted { slot });
            }
        }
        self.grow_to_fit(slot);
        let slots = self.slots.read();
        slots[slot]
            .set(record)
            .map_err(|_| EngineError::BufferSlotCorrupted { slot })
    }

    fn grow_to_fit(&self, slot: usize) {
        let mut slots = self.slots.write();
        let before = slots.len();
        let mut len = before;
        while slot >= len {
            len *= 2;
        }
        if len > before {
            slots.resize_with(len, OnceLock::new);
            self.growths.fetch_add(1, Ordering::Relaxed);
            warn!(
                target: "synk-kernel-engine",
                "Receive buffer grown {} -> {} slots",
                before,
                len
            );
        }
    }

    /// Ensure room for `additional` more records without growing mid-phase
    pub fn reserve(&mut self, additional: usize) {
        let needed = self.cnt.load(Ordering::Acquire) + additional;
        let slots = self.slots.get_mut();
        if slots.len() < needed {
            slots.resize_with(needed.next_power_of_two(), OnceLock::new);
        }
    }

    pub fn len(&self) -> usize {
        self.cnt.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    /// Number of times the backing storage was reallocated
    pub fn growths(&self) -> usize {
        self.growths.load(Ordering::Relaxed)
    }

    /// Take every record in reservation order and reset to empty.
    ///
    /// Exclusive access guarantees all enqueues have completed.
    pub fn drain(&mut self) -> Result<Vec<EventRecord>> {
        let count = std::mem::replace(self.cnt.get_mut(), 0);
        let slots = self.slots.get_mut();
        let mut records = Vec::with_capacity(count);
        let mut corrupted = None;
        for (slot, cell) in slots.iter_mut().take(count).enumerate() {
            match cell.take() {
                Some(record) => records.push(record),
                None => corrupted = corrupted.or(Some(slot)),
            }
        }
        match corrupted {
            Some(slot) => Err(EngineError::BufferSlotCorrupted { slot }),
            None => Ok(records),
        }
    }

    pub fn drain_grouped(&mut self) -> Result<GroupedEvents> {
        Ok(GroupedEvents::from_events(self.drain()?))
    }
}

impl Default for NetReceiveBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECEIVE_CAPACITY)
    }
}
