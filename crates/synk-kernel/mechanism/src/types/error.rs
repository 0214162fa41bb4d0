// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for mechanism kernels

use super::ids::InstanceId;

/// Errors raised by mechanism models and their numerical kernels
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MechanismError {
    /// A delivery time earlier than the instance's last applied time.
    /// This indicates a scheduler defect and is fatal.
    #[error("out-of-order delivery to {instance}: last applied t={last}, requested t={requested}")]
    OutOfOrderDelivery {
        instance: InstanceId,
        last: f64,
        requested: f64,
    },

    /// Zero, negative or non-finite rate constant in a closed-form update
    #[error("degenerate rate {name} = {value}: {reason}")]
    DegenerateRate {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("row has {actual} slots, expected {expected}")]
    RowSizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = core::result::Result<T, MechanismError>;
pub type Error = MechanismError;
