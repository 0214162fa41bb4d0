// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine error types

use synk_kernel_mechanism::MechanismError;
use synk_kernel_runtime::StorageError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Mechanism(#[from] MechanismError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Send buffer full on a path that may not grow mid-phase
    #[error("send buffer overflow: capacity {capacity}, slot {requested} requested")]
    SendBufferOverflow { capacity: usize, requested: usize },

    /// A reserved buffer slot was found empty or written twice
    #[error("event buffer slot {slot} in inconsistent state")]
    BufferSlotCorrupted { slot: usize },

    #[error("global parameter block for {mechanism} is not allocated")]
    GlobalsNotAllocated { mechanism: &'static str },

    #[error("global parameter block for {mechanism} is already allocated")]
    GlobalsAlreadyAllocated { mechanism: &'static str },

    #[error("device mirror holds {actual} bytes, expected {expected}")]
    DeviceMirrorLayout { expected: usize, actual: usize },

    #[error("mechanism {0} is already registered")]
    DuplicateMechanism(String),

    #[error("unknown mechanism: {0}")]
    UnknownMechanism(String),

    #[error(
        "slot count mismatch for {mechanism}: registered psize={expected_psize} ppsize={expected_ppsize}, \
         store has psize={actual_psize} ppsize={actual_ppsize}"
    )]
    SlotCountMismatch {
        mechanism: String,
        expected_psize: usize,
        expected_ppsize: usize,
        actual_psize: usize,
        actual_ppsize: usize,
    },

    #[error("invalid event time {0}")]
    InvalidEventTime(f64),

    #[error("invalid time step {0}")]
    InvalidTimeStep(f64),

    #[error("invalid backend: {0}")]
    InvalidBackend(String),

    #[error("invalid accumulation strategy: {0}")]
    InvalidAccumulation(String),

    #[error("invalid event mode: {0}")]
    InvalidEventMode(String),
}

pub type Result<T> = core::result::Result<T, EngineError>;
