// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Kernel Types Module
//!
//! Core type definitions shared by every mechanism kernel.

pub mod error;
pub mod event;
pub mod ids;

pub use error::{Error, MechanismError, Result};
pub use event::{EventRecord, SendRecord, EXTERNAL_ACTIVATION_FLAG};
pub use ids::{InstanceId, NodeIndex, WeightIndex};
