// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event records exchanged between the event queue, the receive buffer
//! and the send buffer.

use super::ids::{InstanceId, WeightIndex};

/// Flag value of an externally triggered activation.
pub const EXTERNAL_ACTIVATION_FLAG: f64 = 0.0;

/// One pending "net receive" delivery.
///
/// `flag == 0.0` is an external activation; any other value is a
/// self-event tagged with the activation counter that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub instance: InstanceId,
    pub weight: WeightIndex,
    pub time: f64,
    pub flag: f64,
}

impl EventRecord {
    /// External activation delivered at `time`
    pub fn activation(instance: InstanceId, weight: WeightIndex, time: f64) -> Self {
        Self {
            instance,
            weight,
            time,
            flag: EXTERNAL_ACTIVATION_FLAG,
        }
    }

    pub fn self_event(instance: InstanceId, weight: WeightIndex, time: f64, flag: f64) -> Self {
        Self {
            instance,
            weight,
            time,
            flag,
        }
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.flag == EXTERNAL_ACTIVATION_FLAG
    }
}

/// A self-event scheduling request produced by an instance while it
/// handles a delivery. Staged in the send buffer until the batch drains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendRecord {
    /// Point-process index of the scheduling instance
    pub point_process: usize,
    /// Self-event queue handle slot of the scheduling instance
    pub queue_handle: usize,
    pub weight: WeightIndex,
    pub time: f64,
    pub flag: f64,
}
