// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use synk_kernel_engine::*;
use synk_kernel_mechanism::{AmpaModel, AmpaParameters, InstanceId, NodeIndex, WeightIndex};
use synk_kernel_runtime::{Attachment, InstanceStore, NodeMatrix};

pub struct Network {
    pub kernel: MechanismKernel<AmpaModel>,
    pub nodes: NodeMatrix,
    pub weights: Vec<WeightIndex>,
}

/// `instances` AMPA synapses spread over `node_count` nodes, one connection each
pub fn network(
    backend: BackendType,
    accumulation: AccumulationStrategy,
    mode: EventMode,
    instances: usize,
    node_count: usize,
) -> Network {
    let mut nodes = NodeMatrix::new(node_count, -65.0);
    let areas: Vec<usize> = (0..node_count)
        .map(|n| nodes.push_area(50.0 + n as f64))
        .collect();
    for n in 0..node_count {
        nodes
            .set_voltage(NodeIndex(n as u32), -70.0 + 3.0 * n as f64)
            .unwrap();
    }

    let mut store = InstanceStore::for_mechanism::<AmpaModel>(0).unwrap();
    for i in 0..instances {
        let n = i % node_count;
        store.push(Attachment {
            node: NodeIndex(n as u32),
            area_index: areas[n],
        });
    }

    let config = KernelConfig {
        dt: 0.025,
        event_mode: mode,
        accumulation,
        record_cell_state: true,
        receive_capacity: 4,
        send_capacity: 4,
        ..Default::default()
    };
    let mut kernel = MechanismKernel::new(
        AmpaParameters::default(),
        store,
        config,
        create_backend::<AmpaModel>(backend),
    )
    .unwrap();
    let weights = (0..instances)
        .map(|i| kernel.connect(InstanceId(i as u32), 0.5 + 0.01 * i as f64).unwrap())
        .collect();
    kernel.init().unwrap();
    Network {
        kernel,
        nodes,
        weights,
    }
}

/// Deterministic spike train: (instance, time) pairs sorted by time
pub fn spike_train(instances: usize, count: usize) -> Vec<(usize, f64)> {
    let mut spikes: Vec<(usize, f64)> = (0..count)
        .map(|k| ((k * 7 + 3) % instances, 0.05 * ((k * 13) % 40) as f64))
        .collect();
    spikes.sort_by(|a, b| a.1.total_cmp(&b.1));
    spikes
}

/// Drive a network for `steps` steps, delivering queued events like the simulation driver
pub fn drive(net: &mut Network, spikes: &[(usize, f64)], steps: usize) {
    let mut queue = TimeQueue::new();
    for &(i, t) in spikes {
        queue
            .schedule(synk_kernel_mechanism::EventRecord::activation(
                InstanceId(i as u32),
                net.weights[i],
                t,
            ))
            .unwrap();
    }
    let dt = net.kernel.dt();
    for step in 0..steps {
        let t = step as f64 * dt;
        net.kernel.begin_step().unwrap();
        loop {
            let due = queue.pop_due(t + 0.5 * dt);
            if due.is_empty() {
                break;
            }
            for event in due {
                net.kernel.net_receive(event, &mut queue).unwrap();
            }
            net.kernel.flush_events(&mut queue).unwrap();
        }
        net.nodes.clear_contributions();
        net.kernel.compute_current(&mut net.nodes).unwrap();
        net.kernel.advance_state().unwrap();
    }
}
