// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Mechanism Kernel
//!
//! Owns one mechanism type's instances, weight blocks, global block and
//! event buffers, and exposes the phases a scheduler drives:
//!
//! ```text
//! init ─► per step: begin_step ─► flush_events ─► compute_current ─► advance_state
//!                       ▲
//!         net_receive / enqueue (any time before the flush)
//! ```
//!
//! Phases taking `&mut self` are the serial boundaries: every enqueue made
//! through `&self` has completed before a flush can start.

use synk_kernel_mechanism::{EventRecord, InstanceId, Mechanism, WeightIndex};
use synk_kernel_runtime::{Attachment, InstanceStore, NodeMatrix, WeightStore};
use tracing::{debug, info, warn};

use crate::backend::{AccumulationStrategy, ComputeBackend, CurrentOptions, EventTally};
use crate::error::{EngineError, Result};
use crate::global_params::GlobalParameterBlock;
use crate::net_receive_buffer::{GroupedEvents, NetReceiveBuffer, DEFAULT_RECEIVE_CAPACITY};
use crate::net_send_buffer::{NetSendBuffer, SendBufferMode, DEFAULT_SEND_CAPACITY};
use crate::registry::Registration;
use crate::time_queue::SelfEventSink;
use crate::KernelStats;

/// How `net_receive` applies deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventMode {
    /// Collect into the receive buffer; apply at `flush_events`
    #[default]
    Buffered,
    /// Apply at once and schedule straight into the sink
    Immediate,
}

impl std::fmt::Display for EventMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventMode::Buffered => write!(f, "buffered"),
            EventMode::Immediate => write!(f, "immediate"),
        }
    }
}

impl std::str::FromStr for EventMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "buffered" => Ok(EventMode::Buffered),
            "immediate" => Ok(EventMode::Immediate),
            _ => Err(EngineError::InvalidEventMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub celsius: f64,
    pub dt: f64,
    pub event_mode: EventMode,
    pub accumulation: AccumulationStrategy,
    pub record_cell_state: bool,
    pub receive_capacity: usize,
    pub send_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            celsius: 6.3,
            dt: 0.025,
            event_mode: EventMode::Buffered,
            accumulation: AccumulationStrategy::Shadow,
            record_cell_state: false,
            receive_capacity: DEFAULT_RECEIVE_CAPACITY,
            send_capacity: DEFAULT_SEND_CAPACITY,
        }
    }
}

pub struct MechanismKernel<M: Mechanism> {
    globals: GlobalParameterBlock<M>,
    store: InstanceStore,
    weights: WeightStore,
    receive: NetReceiveBuffer,
    send: NetSendBuffer,
    backend: Box<dyn ComputeBackend<M>>,
    config: KernelConfig,
    stats: KernelStats,
}

impl<M: Mechanism> MechanismKernel<M> {
    /// Build a kernel around an existing store and allocate its global block
    pub fn new(
        parameters: M::Parameters,
        store: InstanceStore,
        config: KernelConfig,
        backend: Box<dyn ComputeBackend<M>>,
    ) -> Result<Self> {
        if store.psize() != M::PSIZE || store.ppsize() != M::PPSIZE {
            return Err(EngineError::SlotCountMismatch {
                mechanism: M::NAME.to_string(),
                expected_psize: M::PSIZE,
                expected_ppsize: M::PPSIZE,
                actual_psize: store.psize(),
                actual_ppsize: store.ppsize(),
            });
        }
        if !(config.dt.is_finite() && config.dt > 0.0) {
            return Err(EngineError::InvalidTimeStep(config.dt));
        }

        let mut globals = GlobalParameterBlock::new(parameters, config.celsius, config.dt);
        if backend.uses_device_mirror() {
            globals.attach_mirror();
        }
        globals.create()?;

        info!(
            target: "synk-kernel-engine",
            "{} kernel: {} instances, backend={}, events={}, accumulation={}",
            M::NAME,
            store.len(),
            backend.backend_name(),
            config.event_mode,
            config.accumulation
        );

        Ok(Self {
            globals,
            store,
            weights: WeightStore::new(M::WEIGHT_WIDTH)?,
            receive: NetReceiveBuffer::with_capacity(config.receive_capacity),
            send: NetSendBuffer::new(config.send_capacity, SendBufferMode::Growable),
            backend,
            config,
            stats: KernelStats::default(),
        })
    }

    pub fn registration(&self) -> Registration {
        Registration::of::<M>(self.config.event_mode == EventMode::Buffered)
    }

    pub fn add_instance(&mut self, attachment: Attachment) -> InstanceId {
        self.store.push(attachment)
    }

    /// Allocate a weight block bound to `target`
    pub fn connect(&mut self, target: InstanceId, weight: f64) -> Result<WeightIndex> {
        self.store.row(target)?;
        Ok(self.weights.connect(target, weight))
    }

    /// Initial conditions for every instance; clears pending events
    pub fn init(&mut self) -> Result<()> {
        self.globals.refresh()?;
        let globals = self.backend.phase_globals(&self.globals)?;
        self.backend.init_instances(&globals, &mut self.store)?;
        self.weights.reset_bookkeeping();
        self.receive.drain()?;
        self.send.drain()?;
        Ok(())
    }

    /// Serial refresh of the global block at the start of a step
    pub fn begin_step(&mut self) -> Result<()> {
        self.globals.refresh()
    }

    pub fn compute_current(&mut self, nodes: &mut NodeMatrix) -> Result<()> {
        let globals = self.backend.phase_globals(&self.globals)?;
        let options = CurrentOptions {
            accumulation: self.config.accumulation,
            record_cell_state: self.config.record_cell_state,
        };
        self.backend
            .compute_current(&globals, &mut self.store, nodes, options)
    }

    pub fn advance_state(&mut self) -> Result<()> {
        let globals = self.backend.phase_globals(&self.globals)?;
        self.backend
            .advance_state(&globals, &mut self.store, self.config.dt)?;
        self.stats.steps += 1;
        Ok(())
    }

    /// Buffer a delivery; safe from many threads
    pub fn enqueue(&self, event: EventRecord) -> Result<()> {
        self.receive.enqueue(event)
    }

    /// Pre-size the receive buffer for `additional` buffered deliveries
    pub fn reserve_events(&mut self, additional: usize) {
        if self.config.event_mode == EventMode::Buffered {
            self.receive.reserve(additional);
        }
    }

    /// Deliver according to the configured event mode
    pub fn net_receive<S: SelfEventSink>(&mut self, event: EventRecord, sink: &mut S) -> Result<()> {
        match self.config.event_mode {
            EventMode::Buffered => self.receive.enqueue(event),
            EventMode::Immediate => {
                if !event.time.is_finite() {
                    return Err(EngineError::InvalidEventTime(event.time));
                }
                self.apply_grouped(GroupedEvents::from_events(vec![event]), sink)?;
                Ok(())
            }
        }
    }

    /// Apply everything buffered, then drain self-events into `sink`
    pub fn flush_events<S: SelfEventSink>(&mut self, sink: &mut S) -> Result<EventTally> {
        let grouped = self.receive.drain_grouped()?;
        if grouped.is_empty() {
            return Ok(EventTally::default());
        }
        self.stats.flushes += 1;
        debug!(
            target: "synk-kernel-engine",
            "{} flush: {} events in {} runs",
            M::NAME,
            grouped.event_count(),
            grouped.run_count()
        );
        self.apply_grouped(grouped, sink)
    }

    fn apply_grouped<S: SelfEventSink>(
        &mut self,
        grouped: GroupedEvents,
        sink: &mut S,
    ) -> Result<EventTally> {
        let globals = self.backend.phase_globals(&self.globals)?;
        self.backend
            .prepare_send_buffer(&mut self.send, grouped.event_count());
        let applied = self.backend.apply_events(
            &globals,
            &mut self.store,
            &mut self.weights,
            &grouped,
            &self.send,
        );
        let tally = match applied {
            Ok(tally) => tally,
            Err(err) => {
                // Staged self-events belong to the failed batch
                let discarded = self.send.drain().map(|r| r.len()).unwrap_or(0);
                warn!(
                    target: "synk-kernel-engine",
                    "{} flush failed, discarded {} staged self-events: {}",
                    M::NAME,
                    discarded,
                    err
                );
                return Err(err);
            }
        };

        for record in self.send.drain()? {
            let instance = self.store.instance_for_point_process(record.point_process)?;
            sink.schedule(EventRecord::self_event(
                instance,
                record.weight,
                record.time,
                record.flag,
            ))?;
        }

        self.stats.record_tally(&tally);
        Ok(tally)
    }

    /// Derivatives of the state slots at the current state
    pub fn ode_spec(&mut self) -> Result<()> {
        let globals = self.globals.snapshot()?;
        for row in self.store.rows_mut() {
            M::ode_spec(&globals, row);
        }
        Ok(())
    }

    /// Implicit diagonal solve of the derivative slots
    pub fn ode_matsol(&mut self, dt: f64) -> Result<()> {
        let globals = self.globals.snapshot()?;
        for row in self.store.rows_mut() {
            M::ode_matsol(&globals, row, dt);
        }
        Ok(())
    }

    pub fn state(&self, instance: InstanceId, slot: usize) -> Result<f64> {
        Ok(self.store.get(instance, slot)?)
    }

    pub fn weight_block(&self, weight: WeightIndex) -> Result<&[f64]> {
        Ok(self.weights.block(weight)?)
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    pub fn globals(&self) -> &GlobalParameterBlock<M> {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut GlobalParameterBlock<M> {
        &mut self.globals
    }

    pub fn pending_events(&self) -> usize {
        self.receive.len()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn dt(&self) -> f64 {
        self.config.dt
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    pub fn stats(&self) -> KernelStats {
        let mut stats = self.stats.clone();
        stats.receive_buffer_growths = self.receive.growths() as u64;
        stats.send_buffer_growths = self.send.growths() as u64;
        stats
    }

    /// Release the global block
    pub fn teardown(&mut self) {
        self.globals.destroy();
    }
}
