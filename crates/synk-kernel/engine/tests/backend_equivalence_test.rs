// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Backend Equivalence Tests
//!
//! Host and accelerator backends run the same per-instance kernels, so
//! instance state and weight bookkeeping must match bit for bit. Node sums
//! may differ in the last bits under atomic accumulation.

mod common;

use common::{drive, network, spike_train, Network};
use synk_kernel_engine::*;
use synk_kernel_mechanism::NodeIndex;

const INSTANCES: usize = 64;
const NODES: usize = 5;
const STEPS: usize = 200;

fn run(backend: BackendType, accumulation: AccumulationStrategy) -> Network {
    let mut net = network(backend, accumulation, EventMode::Buffered, INSTANCES, NODES);
    drive(&mut net, &spike_train(INSTANCES, 300), STEPS);
    net
}

fn assert_same_instances(a: &Network, b: &Network) {
    assert_eq!(a.kernel.store().data(), b.kernel.store().data());
    for w in &a.weights {
        assert_eq!(
            a.kernel.weight_block(*w).unwrap(),
            b.kernel.weight_block(*w).unwrap()
        );
    }
}

fn assert_close_nodes(a: &Network, b: &Network) {
    for n in 0..NODES {
        let node = NodeIndex(n as u32);
        let (ra, rb) = (a.nodes.rhs(node).unwrap(), b.nodes.rhs(node).unwrap());
        let (da, db) = (a.nodes.d(node).unwrap(), b.nodes.d(node).unwrap());
        assert!((ra - rb).abs() <= 1e-9 * (1.0 + ra.abs()), "rhs {} vs {}", ra, rb);
        assert!((da - db).abs() <= 1e-9 * (1.0 + da.abs()), "d {} vs {}", da, db);
    }
}

#[test]
fn test_host_and_accelerator_match() {
    let host = run(BackendType::Host, AccumulationStrategy::Shadow);
    let accel = run(BackendType::Accelerator, AccumulationStrategy::Atomic);
    assert_same_instances(&host, &accel);
    assert_close_nodes(&host, &accel);

    let hs = host.kernel.stats();
    let acs = accel.kernel.stats();
    assert_eq!(hs.events_delivered, acs.events_delivered);
    assert_eq!(hs.activations, acs.activations);
    assert_eq!(hs.stale_events, acs.stale_events);
    assert!(hs.events_delivered > 300);
}

#[test]
fn test_shadow_reduce_is_identical_across_backends() {
    let host = run(BackendType::Host, AccumulationStrategy::Shadow);
    let accel = run(BackendType::Accelerator, AccumulationStrategy::Shadow);
    assert_same_instances(&host, &accel);
    for n in 0..NODES {
        let node = NodeIndex(n as u32);
        assert_eq!(host.nodes.rhs(node).unwrap(), accel.nodes.rhs(node).unwrap());
        assert_eq!(host.nodes.d(node).unwrap(), accel.nodes.d(node).unwrap());
    }
}

#[test]
fn test_host_atomic_matches_host_shadow() {
    let shadow = run(BackendType::Host, AccumulationStrategy::Shadow);
    let atomic = run(BackendType::Host, AccumulationStrategy::Atomic);
    assert_same_instances(&shadow, &atomic);
    assert_close_nodes(&shadow, &atomic);
}

#[test]
fn test_accelerator_reads_globals_from_mirror() {
    let accel = run(BackendType::Accelerator, AccumulationStrategy::Atomic);
    let mirror = accel.kernel.globals().mirror().unwrap();
    // create + init + one refresh per step
    assert_eq!(mirror.generation(), 2 + STEPS as u64);
    let host = run(BackendType::Host, AccumulationStrategy::Shadow);
    assert!(host.kernel.globals().mirror().is_none());
}
