// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Backend Abstraction
//!
//! One interface, two executions of the same per-instance kernels:
//! - **Host**: serial loops, shadow accumulators reduced in a second pass
//! - **Accelerator**: data-parallel loops, atomic accumulation, grouped
//!   event runs applied concurrently, globals read from the device mirror
//!
//! Both call the same `Mechanism` functions, so instance state evolves
//! identically whichever backend runs a phase.

mod accelerator;
mod host;

pub use accelerator::AcceleratorBackend;
pub use host::HostBackend;

use serde::{Deserialize, Serialize};
use synk_kernel_mechanism::{
    area_factor, linearize, EventRecord, Linearization, Mechanism, MechanismKind, SendRecord,
    Transition,
};
use synk_kernel_runtime::{InstanceStore, NodeMatrix, StorageError, WeightStore, AREA_DPARAM};

use crate::error::{EngineError, Result};
use crate::global_params::GlobalParameterBlock;
use crate::net_receive_buffer::GroupedEvents;
use crate::net_send_buffer::{NetSendBuffer, SendBufferMode};
use crate::trace::trace_transition;

/// How linearized contributions reach the shared node accumulators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccumulationStrategy {
    /// `fetch_add` straight into the node matrix
    Atomic,
    /// Per-instance staging, then a sequential reduce
    Shadow,
}

impl AccumulationStrategy {
    /// Natural strategy for a backend
    pub fn default_for(backend: BackendType) -> Self {
        match backend {
            BackendType::Accelerator => AccumulationStrategy::Atomic,
            BackendType::Host | BackendType::Auto => AccumulationStrategy::Shadow,
        }
    }
}

impl std::fmt::Display for AccumulationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccumulationStrategy::Atomic => write!(f, "atomic"),
            AccumulationStrategy::Shadow => write!(f, "shadow"),
        }
    }
}

impl std::str::FromStr for AccumulationStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "atomic" => Ok(AccumulationStrategy::Atomic),
            "shadow" => Ok(AccumulationStrategy::Shadow),
            _ => Err(EngineError::InvalidAccumulation(s.to_string())),
        }
    }
}

/// Options for the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentOptions {
    pub accumulation: AccumulationStrategy,
    /// Write the voltage and conductance used into the recording slots
    pub record_cell_state: bool,
}

/// Per-transition counts from one batch of deliveries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
    pub delivered: u64,
    pub activations: u64,
    pub retriggers: u64,
    pub deactivations: u64,
    pub stale: u64,
    pub scheduled: u64,
}

impl EventTally {
    #[inline]
    pub fn record(&mut self, transition: Transition) {
        self.delivered += 1;
        match transition {
            Transition::Activated => self.activations += 1,
            Transition::Retriggered => self.retriggers += 1,
            Transition::Deactivated => self.deactivations += 1,
            Transition::Stale => self.stale += 1,
        }
    }

    pub fn merge(&mut self, other: &EventTally) {
        self.delivered += other.delivered;
        self.activations += other.activations;
        self.retriggers += other.retriggers;
        self.deactivations += other.deactivations;
        self.stale += other.stale;
        self.scheduled += other.scheduled;
    }
}

/// Compute backend trait (host, accelerator)
///
/// Generic over the mechanism so the per-instance kernels inline into the
/// backend loops.
pub trait ComputeBackend<M: Mechanism>: Send + Sync {
    /// Backend name for logging/debugging
    fn backend_name(&self) -> &str;

    fn backend_type(&self) -> BackendType;

    /// Whether the global block must be mirrored for this backend
    fn uses_device_mirror(&self) -> bool {
        false
    }

    /// Globals snapshot handed to the phases of one step
    fn phase_globals(&self, block: &GlobalParameterBlock<M>) -> Result<M::Globals> {
        block.snapshot()
    }

    fn init_instances(&mut self, globals: &M::Globals, store: &mut InstanceStore) -> Result<()>;

    /// Linearize every instance's current and scatter it into `nodes`
    fn compute_current(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        nodes: &mut NodeMatrix,
        options: CurrentOptions,
    ) -> Result<()>;

    fn advance_state(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        dt: f64,
    ) -> Result<()>;

    /// Host-side preparation before `apply_events`; `incoming` deliveries
    /// can schedule at most `incoming` self-events
    fn prepare_send_buffer(&self, sends: &mut NetSendBuffer, incoming: usize) {
        let _ = incoming;
        sends.set_mode(SendBufferMode::Growable);
    }

    /// Apply grouped deliveries through the event state machine.
    ///
    /// A batch with a bad owner or index fails before any state changes. A
    /// delivery earlier than its instance's clock is fatal; the host keeps
    /// the transitions before it, the accelerator keeps none.
    fn apply_events(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        weights: &mut WeightStore,
        events: &GroupedEvents,
        sends: &NetSendBuffer,
    ) -> Result<EventTally>;
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendType {
    /// Serial host loops
    Host,
    /// Data-parallel execution with atomic accumulation
    Accelerator,
    /// Pick by instance count
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Host => write!(f, "host"),
            BackendType::Accelerator => write!(f, "accelerator"),
            BackendType::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "host" | "cpu" => Ok(BackendType::Host),
            "accelerator" | "parallel" => Ok(BackendType::Accelerator),
            "auto" => Ok(BackendType::Auto),
            _ => Err(EngineError::InvalidBackend(s.to_string())),
        }
    }
}

/// Configuration for backend auto-selection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Minimum instances before the accelerator pays off (default: 10,000)
    pub accelerator_instance_threshold: usize,
    /// Force host even if the accelerator would be chosen
    pub force_host: bool,
    /// Force accelerator even for small populations (for testing)
    pub force_accelerator: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            accelerator_instance_threshold: 10_000,
            force_host: false,
            force_accelerator: false,
        }
    }
}

impl BackendConfig {
    /// Translate a requested backend type into selection flags
    pub fn for_requested(requested: BackendType, accelerator_instance_threshold: usize) -> Self {
        Self {
            accelerator_instance_threshold,
            force_host: requested == BackendType::Host,
            force_accelerator: requested == BackendType::Accelerator,
        }
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
}

/// Select a concrete backend for `instance_count` instances
///
/// Selection priority:
/// 1. Honor force flags (force_host, then force_accelerator)
/// 2. Accelerator at or above the instance threshold
/// 3. Host otherwise
pub fn select_backend(instance_count: usize, config: &BackendConfig) -> BackendDecision {
    if config.force_host {
        return BackendDecision {
            backend_type: BackendType::Host,
            reason: "Forced host by configuration".to_string(),
        };
    }
    if config.force_accelerator {
        return BackendDecision {
            backend_type: BackendType::Accelerator,
            reason: "Forced accelerator by configuration".to_string(),
        };
    }
    if instance_count >= config.accelerator_instance_threshold {
        BackendDecision {
            backend_type: BackendType::Accelerator,
            reason: format!(
                "{} instances >= threshold {}",
                instance_count, config.accelerator_instance_threshold
            ),
        }
    } else {
        BackendDecision {
            backend_type: BackendType::Host,
            reason: format!(
                "{} instances < threshold {}",
                instance_count, config.accelerator_instance_threshold
            ),
        }
    }
}

/// Construct the backend a decision names
pub fn create_backend<M: Mechanism>(backend_type: BackendType) -> Box<dyn ComputeBackend<M>> {
    match backend_type {
        BackendType::Accelerator => Box::new(AcceleratorBackend::new()),
        BackendType::Host | BackendType::Auto => Box::new(HostBackend::new()),
    }
}

/// Geometric factor for instance `i`, or `None` when it has no membrane contribution
#[inline]
pub(crate) fn membrane_factor<M: Mechanism>(
    nodes: &NodeMatrix,
    pdata: &[usize],
    ppsize: usize,
    i: usize,
) -> Result<Option<f64>> {
    match M::KIND {
        MechanismKind::PointProcess => {
            let index = pdata
                .get(i * ppsize + AREA_DPARAM)
                .copied()
                .ok_or(StorageError::SlotOutOfRange {
                    slot: AREA_DPARAM,
                    psize: ppsize,
                })?;
            let area = nodes.area(index)?;
            Ok(Some(area_factor(area)))
        }
        MechanismKind::Density => Ok(Some(1.0)),
        MechanismKind::ArtificialCell => Ok(None),
    }
}

/// Linearized, scaled contribution of one instance
#[inline(always)]
pub(crate) fn contribution<M: Mechanism>(
    globals: &M::Globals,
    row: &mut [f64],
    v: f64,
    factor: f64,
    record_cell_state: bool,
) -> Linearization {
    let scaled = linearize(|v| M::current(globals, row, v), v).scaled(factor);
    if record_cell_state {
        row[M::RECORDED_VOLTAGE_SLOT] = v;
        row[M::RECORDED_CONDUCTANCE_SLOT] = scaled.conductance;
    }
    scaled
}

/// Where a delivering instance's self-events are addressed
#[derive(Debug, Clone, Copy)]
pub(crate) struct SendAddress {
    pub point_process: usize,
    pub queue_handle: usize,
}

impl SendAddress {
    pub fn of(store: &InstanceStore, event: &EventRecord) -> Result<Self> {
        Ok(Self {
            point_process: store.point_process(event.instance)?,
            queue_handle: store.queue_handle(event.instance)?,
        })
    }
}

/// Run one event through the state machine and stage its self-event
#[inline]
pub(crate) fn deliver<M: Mechanism>(
    globals: &M::Globals,
    row: &mut [f64],
    weight: &mut [f64],
    event: &EventRecord,
    address: SendAddress,
    sends: &NetSendBuffer,
    tally: &mut EventTally,
) -> Result<()> {
    let action = M::net_receive(globals, event.instance, row, weight, event.time, event.flag)?;
    trace_transition(event, action.transition);
    tally.record(action.transition);
    if let Some(send) = action.schedule {
        sends.push(SendRecord {
            point_process: address.point_process,
            queue_handle: address.queue_handle,
            weight: event.weight,
            time: send.time,
            flag: send.flag,
        })?;
        tally.scheduled += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parse_and_display() {
        assert_eq!("HOST".parse::<BackendType>().unwrap(), BackendType::Host);
        assert_eq!("cpu".parse::<BackendType>().unwrap(), BackendType::Host);
        assert_eq!(
            "accelerator".parse::<BackendType>().unwrap(),
            BackendType::Accelerator
        );
        assert!("gpu2".parse::<BackendType>().is_err());
        assert_eq!(BackendType::Accelerator.to_string(), "accelerator");
    }

    #[test]
    fn test_accumulation_parse_and_defaults() {
        assert_eq!(
            "Shadow".parse::<AccumulationStrategy>().unwrap(),
            AccumulationStrategy::Shadow
        );
        assert!("both".parse::<AccumulationStrategy>().is_err());
        assert_eq!(
            AccumulationStrategy::default_for(BackendType::Accelerator),
            AccumulationStrategy::Atomic
        );
        assert_eq!(
            AccumulationStrategy::default_for(BackendType::Host),
            AccumulationStrategy::Shadow
        );
    }

    #[test]
    fn test_tally_merge() {
        let mut a = EventTally::default();
        a.record(Transition::Activated);
        a.record(Transition::Stale);
        let mut b = EventTally::default();
        b.record(Transition::Deactivated);
        b.scheduled = 1;
        a.merge(&b);
        assert_eq!(a.delivered, 3);
        assert_eq!(a.activations, 1);
        assert_eq!(a.deactivations, 1);
        assert_eq!(a.stale, 1);
        assert_eq!(a.scheduled, 1);
    }
}
