// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synk Kernel Runtime Storage
//!
//! Flat storage addressed by integer ids:
//! - **InstanceStore**: AoS rows plus index slots and node mapping
//! - **WeightStore**: per-connection weight blocks bound to one instance
//! - **NodeMatrix**: voltages, area data and shared rhs/d accumulators
//! - **ShadowAccumulator**: per-instance staging reduced into the node matrix

pub mod error;
pub mod instance_store;
pub mod node_matrix;
pub mod shadow;
pub mod weight_store;

pub use error::{Result, StorageError};
pub use instance_store::{
    Attachment, InstanceStore, AREA_DPARAM, NETSEND_DPARAM, POINT_PROCESS_DPARAM,
};
pub use node_matrix::NodeMatrix;
pub use shadow::ShadowAccumulator;
pub use weight_store::WeightStore;
