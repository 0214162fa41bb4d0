// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Synk Kernel Engine
//!
//! Drives mechanism kernels over a population of instances.
//!
//! ## Architecture
//! - Global parameter block refreshed once per step, mirrored for the accelerator
//! - Lock-free slot reservation for concurrent event enqueue
//! - Deliveries grouped by target instance and applied run by run
//! - Self-events staged in a send buffer and drained once per batch
//! - Host and accelerator backends behind one trait

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod device;
pub mod error;
pub mod global_params;
pub mod kernel;
pub mod net_receive_buffer;
pub mod net_send_buffer;
pub mod registry;
pub mod simulation;
pub mod time_queue;
mod trace;

pub use backend::{
    create_backend, select_backend, AccumulationStrategy, AcceleratorBackend, BackendConfig,
    BackendDecision, BackendType, ComputeBackend, CurrentOptions, EventTally, HostBackend,
};
pub use device::DeviceMirror;
pub use error::{EngineError, Result};
pub use global_params::GlobalParameterBlock;
pub use kernel::{EventMode, KernelConfig, MechanismKernel};
pub use net_receive_buffer::{GroupedEvents, NetReceiveBuffer};
pub use net_send_buffer::{NetSendBuffer, SendBufferMode};
pub use registry::{MechanismRegistry, MechanismTypeId, Registration};
pub use simulation::Simulation;
pub use time_queue::{SelfEventSink, TimeQueue};

use serde::{Deserialize, Serialize};

/// Cumulative kernel statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelStats {
    pub steps: u64,
    pub flushes: u64,
    pub events_delivered: u64,
    pub activations: u64,
    pub retriggers: u64,
    pub deactivations: u64,
    pub stale_events: u64,
    pub self_events_scheduled: u64,
    pub receive_buffer_growths: u64,
    pub send_buffer_growths: u64,
}

impl KernelStats {
    pub fn record_tally(&mut self, tally: &EventTally) {
        self.events_delivered += tally.delivered;
        self.activations += tally.activations;
        self.retriggers += tally.retriggers;
        self.deactivations += tally.deactivations;
        self.stale_events += tally.stale;
        self.self_events_scheduled += tally.scheduled;
    }

    /// Get average deliveries per step
    pub fn avg_events_per_step(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.events_delivered as f64 / self.steps as f64
        }
    }

    /// Fraction of self-events that arrived superseded
    pub fn stale_fraction(&self) -> f64 {
        if self.self_events_scheduled == 0 {
            0.0
        } else {
            self.stale_events as f64 / self.self_events_scheduled as f64
        }
    }
}
