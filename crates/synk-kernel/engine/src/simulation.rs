// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-step driver
//!
//! Owns a kernel, its node matrix and the time queue, and runs the phases in
//! order each step:
//!
//! 1. deliver queued events due by `t + dt/2` one timestamp at a time,
//!    flushing after each so self-events landing inside the window are
//!    delivered in time order
//! 2. compute current into freshly cleared node accumulators
//! 3. voltage solve (external; voltages are held)
//! 4. advance state
//! 5. `t = step * dt`

use synk_kernel_mechanism::{EventRecord, InstanceId, Mechanism, WeightIndex};
use synk_kernel_runtime::NodeMatrix;
use tracing::{debug, info};

use crate::backend::EventTally;
use crate::error::Result;
use crate::kernel::MechanismKernel;
use crate::registry::{MechanismRegistry, MechanismTypeId};
use crate::time_queue::{SelfEventSink, TimeQueue};

pub struct Simulation<M: Mechanism> {
    kernel: MechanismKernel<M>,
    nodes: NodeMatrix,
    queue: TimeQueue,
    registry: MechanismRegistry,
    type_id: MechanismTypeId,
    t: f64,
    step: u64,
}

impl<M: Mechanism> Simulation<M> {
    /// Register the kernel's mechanism and take ownership of the model
    pub fn new(kernel: MechanismKernel<M>, nodes: NodeMatrix) -> Result<Self> {
        let mut registry = MechanismRegistry::new();
        let type_id = registry.register(kernel.registration())?;
        registry.check_store(type_id, kernel.store())?;
        Ok(Self {
            kernel,
            nodes,
            queue: TimeQueue::new(),
            registry,
            type_id,
            t: 0.0,
            step: 0,
        })
    }

    pub fn init(&mut self) -> Result<()> {
        self.kernel.init()?;
        self.queue.clear();
        self.nodes.clear_contributions();
        self.t = 0.0;
        self.step = 0;
        info!(
            target: "synk-kernel-engine",
            "Initialized {} simulation: {} instances, dt={}",
            M::NAME,
            self.kernel.store().len(),
            self.kernel.dt()
        );
        Ok(())
    }

    /// Queue an external activation on `weight` at `time`
    pub fn schedule_activation(
        &mut self,
        instance: InstanceId,
        weight: WeightIndex,
        time: f64,
    ) -> Result<()> {
        self.queue
            .schedule(EventRecord::activation(instance, weight, time))
    }

    pub fn step(&mut self) -> Result<EventTally> {
        let dt = self.kernel.dt();
        self.kernel.begin_step()?;

        let horizon = self.t + 0.5 * dt;
        let mut tally = EventTally::default();
        loop {
            let due = self.queue.pop_earliest(horizon);
            if due.is_empty() {
                break;
            }
            self.kernel.reserve_events(due.len());
            for event in due {
                self.kernel.net_receive(event, &mut self.queue)?;
            }
            tally.merge(&self.kernel.flush_events(&mut self.queue)?);
        }
        if tally.delivered > 0 {
            debug!(
                target: "synk-kernel-engine",
                "t={:.4}: delivered {} events ({} activations, {} deactivations, {} stale)",
                self.t,
                tally.delivered,
                tally.activations,
                tally.deactivations,
                tally.stale
            );
        }

        self.nodes.clear_contributions();
        self.kernel.compute_current(&mut self.nodes)?;
        self.kernel.advance_state()?;

        self.step += 1;
        self.t = self.step as f64 * dt;
        Ok(tally)
    }

    /// Step until `t >= tstop`, calling `observer` after every step
    pub fn run_until<F>(&mut self, tstop: f64, mut observer: F) -> Result<EventTally>
    where
        F: FnMut(&Self),
    {
        let mut total = EventTally::default();
        // Half-step slack keeps float rounding from adding a step
        while self.t < tstop - 0.5 * self.kernel.dt() {
            total.merge(&self.step()?);
            observer(self);
        }
        Ok(total)
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn kernel(&self) -> &MechanismKernel<M> {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut MechanismKernel<M> {
        &mut self.kernel
    }

    pub fn nodes(&self) -> &NodeMatrix {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeMatrix {
        &mut self.nodes
    }

    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    pub fn registry(&self) -> &MechanismRegistry {
        &self.registry
    }

    pub fn type_id(&self) -> MechanismTypeId {
        self.type_id
    }
}
