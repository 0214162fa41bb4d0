// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for storage operations

use synk_kernel_mechanism::{InstanceId, NodeIndex, WeightIndex};

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{id} out of range (count {count})")]
    InstanceOutOfRange { id: InstanceId, count: usize },

    #[error("{id} out of range (count {count})")]
    NodeOutOfRange { id: NodeIndex, count: usize },

    #[error("{id} out of range (count {count})")]
    WeightOutOfRange { id: WeightIndex, count: usize },

    #[error("point process {index} does not belong to this store (offset {offset}, count {count})")]
    PointProcessOutOfRange {
        index: usize,
        offset: usize,
        count: usize,
    },

    #[error("area index {index} out of range (node data length {len})")]
    AreaOutOfRange { index: usize, len: usize },

    /// A weight block delivered to an instance other than the one it was connected to
    #[error("{weight} is bound to {owner}, not {requested}")]
    WeightSlotOwnerMismatch {
        weight: WeightIndex,
        owner: InstanceId,
        requested: InstanceId,
    },

    #[error("slot {slot} out of range for row size {psize}")]
    SlotOutOfRange { slot: usize, psize: usize },

    #[error("row size {0} is not supported (must be non-zero)")]
    InvalidRowSize(usize),

    #[error("shadow accumulator holds {actual} entries, store holds {expected}")]
    ShadowSizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = core::result::Result<T, StorageError>;
