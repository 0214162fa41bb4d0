// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host backend
//!
//! Serial loops over instance rows. Shadow accumulation reduces in instance
//! order, so node sums are reproducible run to run.

use synk_kernel_mechanism::Mechanism;
use synk_kernel_runtime::{InstanceStore, NodeMatrix, ShadowAccumulator, WeightStore};

use super::{
    contribution, deliver, membrane_factor, AccumulationStrategy, BackendType, ComputeBackend,
    CurrentOptions, EventTally, SendAddress,
};
use crate::error::Result;
use crate::net_receive_buffer::GroupedEvents;
use crate::net_send_buffer::NetSendBuffer;

#[derive(Debug, Default)]
pub struct HostBackend {
    shadow: ShadowAccumulator,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: Mechanism> ComputeBackend<M> for HostBackend {
    fn backend_name(&self) -> &str {
        "Host (serial)"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Host
    }

    fn init_instances(&mut self, globals: &M::Globals, store: &mut InstanceStore) -> Result<()> {
        for row in store.rows_mut() {
            M::init_instance(globals, row);
        }
        Ok(())
    }

    fn compute_current(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        nodes: &mut NodeMatrix,
        options: CurrentOptions,
    ) -> Result<()> {
        let psize = store.psize();
        let ppsize = store.ppsize();
        let count = store.len();
        let (rows, pdata, node_indices) = store.split_mut();

        match options.accumulation {
            AccumulationStrategy::Shadow => {
                self.shadow.resize(count);
                for (i, row) in rows.chunks_exact_mut(psize).enumerate() {
                    let Some(factor) = membrane_factor::<M>(nodes, pdata, ppsize, i)? else {
                        self.shadow.record(i, 0.0, 0.0);
                        continue;
                    };
                    let v = nodes.voltage(node_indices[i])?;
                    let c = contribution::<M>(globals, row, v, factor, options.record_cell_state);
                    self.shadow.record(i, c.current, c.conductance);
                }
                self.shadow.reduce_into(node_indices, nodes)?;
            }
            AccumulationStrategy::Atomic => {
                for (i, row) in rows.chunks_exact_mut(psize).enumerate() {
                    let Some(factor) = membrane_factor::<M>(nodes, pdata, ppsize, i)? else {
                        continue;
                    };
                    let node = node_indices[i];
                    let v = nodes.voltage(node)?;
                    let c = contribution::<M>(globals, row, v, factor, options.record_cell_state);
                    nodes.scatter_atomic(node, c.current, c.conductance)?;
                }
            }
        }
        Ok(())
    }

    fn advance_state(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        dt: f64,
    ) -> Result<()> {
        for row in store.rows_mut() {
            M::advance_instance(globals, row, dt);
        }
        Ok(())
    }

    fn apply_events(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        weights: &mut WeightStore,
        events: &GroupedEvents,
        sends: &NetSendBuffer,
    ) -> Result<EventTally> {
        // Addressing is checked for the whole batch before any state changes
        let addresses = events
            .runs()
            .flatten()
            .map(|event| {
                weights.check_owner(event.weight, event.instance)?;
                SendAddress::of(store, event)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut tally = EventTally::default();
        for (event, address) in events.runs().flatten().zip(addresses) {
            let row = store.row_mut(event.instance)?;
            let block = weights.block_mut(event.weight)?;
            deliver::<M>(globals, row, block, event, address, sends, &mut tally)?;
        }
        Ok(tally)
    }
}
