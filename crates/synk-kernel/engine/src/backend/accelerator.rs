// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Accelerator backend
//!
//! Data-parallel execution over instance rows (rayon). The global block is
//! read back from its device mirror, node contributions accumulate with
//! atomics, and grouped event runs execute concurrently.
//!
//! Runs are computed in parallel on private copies of their instance row and
//! weight blocks, then written back sequentially. The send buffer is switched
//! to fixed capacity and pre-sized on the host before a batch starts, so no
//! allocation happens inside the parallel section.

use rayon::prelude::*;
use synk_kernel_mechanism::{InstanceId, Mechanism, WeightIndex};
use synk_kernel_runtime::{InstanceStore, NodeMatrix, ShadowAccumulator, WeightStore};

use super::{
    contribution, deliver, membrane_factor, AccumulationStrategy, BackendType, ComputeBackend,
    CurrentOptions, EventTally, SendAddress,
};
use crate::error::Result;
use crate::global_params::GlobalParameterBlock;
use crate::net_receive_buffer::GroupedEvents;
use crate::net_send_buffer::{NetSendBuffer, SendBufferMode};

#[derive(Debug, Default)]
pub struct AcceleratorBackend {
    shadow: ShadowAccumulator,
}

impl AcceleratorBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Private result of one grouped run
struct RunOutcome {
    instance: InstanceId,
    row: Vec<f64>,
    blocks: Vec<(WeightIndex, Vec<f64>)>,
    tally: EventTally,
}

impl<M: Mechanism> ComputeBackend<M> for AcceleratorBackend {
    fn backend_name(&self) -> &str {
        "Accelerator (data-parallel)"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Accelerator
    }

    fn uses_device_mirror(&self) -> bool {
        true
    }

    fn phase_globals(&self, block: &GlobalParameterBlock<M>) -> Result<M::Globals> {
        block.device_snapshot()
    }

    fn init_instances(&mut self, globals: &M::Globals, store: &mut InstanceStore) -> Result<()> {
        store
            .par_rows_mut()
            .for_each(|row| M::init_instance(globals, row));
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
        let record = options.record_cell_state;
        let (rows, pdata, node_indices) = store.split_mut();

        match options.accumulation {
            AccumulationStrategy::Atomic => {
                let shared: &NodeMatrix = nodes;
                rows.par_chunks_exact_mut(psize)
                    .enumerate()
                    .try_for_each(|(i, row)| -> Result<()> {
                        let Some(factor) = membrane_factor::<M>(shared, pdata, ppsize, i)? else {
                            return Ok(());
                        };
                        let node = node_indices[i];
                        let v = shared.voltage(node)?;
                        let c = contribution::<M>(globals, row, v, factor, record);
                        shared.scatter_atomic(node, c.current, c.conductance)?;
                        Ok(())
                    })?;
            }
            AccumulationStrategy::Shadow => {
                self.shadow.resize(count);
                let shared: &NodeMatrix = nodes;
                let (shadow_rhs, shadow_d) = self.shadow.slots_mut();
                rows.par_chunks_exact_mut(psize)
                    .zip(shadow_rhs.par_iter_mut())
                    .zip(shadow_d.par_iter_mut())
                    .enumerate()
                    .try_for_each(|(i, ((row, rhs), d))| -> Result<()> {
                        let Some(factor) = membrane_factor::<M>(shared, pdata, ppsize, i)? else {
                            *rhs = 0.0;
                            *d = 0.0;
                            return Ok(());
                        };
                        let v = shared.voltage(node_indices[i])?;
                        let c = contribution::<M>(globals, row, v, factor, record);
                        *rhs = c.current;
                        *d = c.conductance;
                        Ok(())
                    })?;
                self.shadow.reduce_into(node_indices, nodes)?;
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
        store
            .par_rows_mut()
            .for_each(|row| M::advance_instance(globals, row, dt));
        Ok(())
    }

    fn prepare_send_buffer(&self, sends: &mut NetSendBuffer, incoming: usize) {
        sends.set_mode(SendBufferMode::Fixed);
        sends.reserve(incoming);
    }

    fn apply_events(
        &mut self,
        globals: &M::Globals,
        store: &mut InstanceStore,
        weights: &mut WeightStore,
        events: &GroupedEvents,
        sends: &NetSendBuffer,
    ) -> Result<EventTally> {
        let shared_store: &InstanceStore = store;
        let shared_weights: &WeightStore = weights;

        let outcomes = events
            .runs_vec()
            .into_par_iter()
            .map(|run| -> Result<Option<RunOutcome>> {
                let Some(first) = run.first() else {
                    return Ok(None);
                };
                let instance = first.instance;
                let address = SendAddress::of(shared_store, first)?;
                let mut row = shared_store.row(instance)?.to_vec();
                let mut blocks: Vec<(WeightIndex, Vec<f64>)> = Vec::new();
                let mut tally = EventTally::default();

                for event in run {
                    shared_weights.check_owner(event.weight, event.instance)?;
                    let pos = match blocks.iter().position(|(w, _)| *w == event.weight) {
                        Some(pos) => pos,
                        None => {
                            blocks.push((event.weight, shared_weights.block(event.weight)?.to_vec()));
                            blocks.len() - 1
                        }
                    };
                    deliver::<M>(
                        globals,
                        &mut row,
                        &mut blocks[pos].1,
                        event,
                        address,
                        sends,
                        &mut tally,
                    )?;
                }

                Ok(Some(RunOutcome {
                    instance,
                    row,
                    blocks,
                    tally,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut tally = EventTally::default();
        for outcome in outcomes.into_iter().flatten() {
            store.row_mut(outcome.instance)?.copy_from_slice(&outcome.row);
            for (weight, block) in outcome.blocks {
                weights.block_mut(weight)?.copy_from_slice(&block);
            }
            tally.merge(&outcome.tally);
        }
        Ok(tally)
    }
}
