// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Concurrent Enqueue Tests
//!
//! Many producers enqueue into one kernel at once; after the flush boundary
//! the result must equal a single-threaded enqueue of the same events.

mod common;

use common::network;
use rayon::prelude::*;
use synk_kernel_engine::*;
use synk_kernel_mechanism::{EventRecord, InstanceId};

const INSTANCES: usize = 128;

#[test]
fn test_parallel_producers_match_serial_producer() {
    let build = || {
        network(
            BackendType::Accelerator,
            AccumulationStrategy::Atomic,
            EventMode::Buffered,
            INSTANCES,
            4,
        )
    };

    let mut parallel = build();
    let mut serial = build();

    // One event per instance per producer wave; times identical across instances
    let waves: Vec<f64> = vec![0.0, 0.1, 0.2];
    for &t in &waves {
        let kernel = &parallel.kernel;
        let weights = &parallel.weights;
        (0..INSTANCES).into_par_iter().for_each(|i| {
            kernel
                .enqueue(EventRecord::activation(InstanceId(i as u32), weights[i], t))
                .unwrap();
        });
        for i in 0..INSTANCES {
            serial
                .kernel
                .enqueue(EventRecord::activation(InstanceId(i as u32), serial.weights[i], t))
                .unwrap();
        }
    }
    assert_eq!(parallel.kernel.pending_events(), 3 * INSTANCES);

    let mut queue_p: Vec<EventRecord> = Vec::new();
    let mut queue_s: Vec<EventRecord> = Vec::new();
    let tally_p = parallel.kernel.flush_events(&mut queue_p).unwrap();
    let tally_s = serial.kernel.flush_events(&mut queue_s).unwrap();

    assert_eq!(tally_p, tally_s);
    assert_eq!(tally_p.activations as usize, INSTANCES);
    assert_eq!(tally_p.retriggers as usize, 2 * INSTANCES);
    assert_eq!(parallel.kernel.store().data(), serial.kernel.store().data());

    queue_p.sort_by(|a, b| a.instance.cmp(&b.instance).then(a.flag.total_cmp(&b.flag)));
    queue_s.sort_by(|a, b| a.instance.cmp(&b.instance).then(a.flag.total_cmp(&b.flag)));
    assert_eq!(queue_p, queue_s);
}

#[test]
fn test_enqueue_during_parallel_phase_grows_safely() {
    let mut net = network(BackendType::Host, AccumulationStrategy::Shadow, EventMode::Buffered, 1, 1);
    // Same instance, same time: every event is valid in any order
    let w = net.weights[0];
    (0..10_000).into_par_iter().for_each(|_| {
        net.kernel
            .enqueue(EventRecord::activation(InstanceId(0), w, 1.0))
            .unwrap();
    });
    let mut queue: Vec<EventRecord> = Vec::new();
    let tally = net.kernel.flush_events(&mut queue).unwrap();
    assert_eq!(tally.delivered, 10_000);
    assert_eq!(tally.activations, 1);
    assert_eq!(queue.len(), 10_000);
    assert!(net.kernel.stats().receive_buffer_growths > 0);
}
