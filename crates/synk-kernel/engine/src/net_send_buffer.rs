// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Net Send Buffer
//!
//! Self-events scheduled while a batch of deliveries is applied. Producers
//! reserve slots with an atomic counter; the batch's owner drains the buffer
//! exactly once into the time queue afterwards.
//!
//! Two overflow disciplines:
//! - `Growable`: records past capacity go to a locked spill list; capacity is
//!   raised when the buffer drains.
//! - `Fixed`: the host must `reserve` before the parallel phase starts.
//!   Overflow is reported, never dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use synk_kernel_mechanism::SendRecord;
use tracing::warn;

use crate::error::{EngineError, Result};

pub const DEFAULT_SEND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBufferMode {
    Growable,
    Fixed,
}

#[derive(Debug)]
pub struct NetSendBuffer {
    slots: Vec<OnceLock<SendRecord>>,
    cnt: AtomicUsize,
    spill: Mutex<Vec<SendRecord>>,
    mode: SendBufferMode,
    growths: usize,
}

impl NetSendBuffer {
    pub fn new(capacity: usize, mode: SendBufferMode) -> Self {
        Self {
            slots: (0..capacity.max(1)).map(|_| OnceLock::new()).collect(),
            cnt: AtomicUsize::new(0),
            spill: Mutex::new(Vec::new()),
            mode,
            growths: 0,
        }
    }

    pub fn mode(&self) -> SendBufferMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SendBufferMode) {
        self.mode = mode;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.cnt.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn growths(&self) -> usize {
        self.growths
    }

    /// Host-side pre-sizing: room for `additional` more records
    pub fn reserve(&mut self, additional: usize) {
        let needed = *self.cnt.get_mut() + additional;
        if needed > self.slots.len() {
            self.slots
                .resize_with(needed.next_power_of_two(), OnceLock::new);
            self.growths += 1;
        }
    }

    /// Stage a record; safe from many threads at once
    pub fn push(&self, record: SendRecord) -> Result<()> {
        let slot = self.cnt.fetch_add(1, Ordering::AcqRel);
        if let Some(cell) = self.slots.get(slot) {
            return cell
                .set(record)
                .map_err(|_| EngineError::BufferSlotCorrupted { slot });
        }
        match self.mode {
            SendBufferMode::Growable => {
                self.spill.lock().push(record);
                Ok(())
            }
            SendBufferMode::Fixed => {
                // Counted reservations past capacity are discarded at drain
                Err(EngineError::SendBufferOverflow {
                    capacity: self.slots.len(),
                    requested: slot + 1,
                })
            }
        }
    }

    /// Remove every staged record, in slot order then spill order
    pub fn drain(&mut self) -> Result<Vec<SendRecord>> {
        let count = std::mem::replace(self.cnt.get_mut(), 0);
        let in_slots = count.min(self.slots.len());
        let mut records = Vec::with_capacity(count);
        let mut corrupted = None;
        for (slot, cell) in self.slots.iter_mut().take(in_slots).enumerate() {
            match cell.take() {
                Some(record) => records.push(record),
                None => corrupted = corrupted.or(Some(slot)),
            }
        }
        let spill = std::mem::take(self.spill.get_mut());
        if !spill.is_empty() {
            let before = self.slots.len();
            let len = count.next_power_of_two();
            self.slots.resize_with(len, OnceLock::new);
            self.growths += 1;
            warn!(
                target: "synk-kernel-engine",
                "Send buffer spilled {} records, grown {} -> {} slots",
                spill.len(),
                before,
                len
            );
        }
        records.extend(spill);
        match corrupted {
            Some(slot) => Err(EngineError::BufferSlotCorrupted { slot }),
            None => Ok(records),
        }
    }
}

impl Default for NetSendBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_CAPACITY, SendBufferMode::Growable)
    }
}
