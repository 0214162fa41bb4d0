// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Regrouping Invariance Tests
//!
//! Delivering a batch through the buffered/grouped path must leave every
//! instance exactly as delivering the same events one at a time does.

mod common;

use common::network;
use proptest::prelude::*;
use synk_kernel_engine::*;
use synk_kernel_mechanism::{EventRecord, InstanceId};

const INSTANCES: usize = 6;

/// Per-instance increasing times, interleaved across instances
fn batch(raw: &[(usize, u8)]) -> Vec<(usize, f64, bool)> {
    let mut clock = vec![0.0f64; INSTANCES];
    raw.iter()
        .map(|&(i, r)| {
            clock[i] += 0.01 + (r % 5) as f64 * 0.1;
            (i, clock[i], r % 3 == 0)
        })
        .collect()
}

fn events_for(net: &common::Network, batch: &[(usize, f64, bool)]) -> Vec<EventRecord> {
    batch
        .iter()
        .map(|&(i, t, self_event)| {
            let id = InstanceId(i as u32);
            if self_event {
                // Flag 1 matches the first activation's counter; otherwise stale
                EventRecord::self_event(id, net.weights[i], t, 1.0)
            } else {
                EventRecord::activation(id, net.weights[i], t)
            }
        })
        .collect()
}

fn apply(backend: BackendType, mode: EventMode, batch: &[(usize, f64, bool)]) -> (Vec<f64>, Vec<Vec<f64>>, Vec<EventRecord>) {
    let mut net = network(backend, AccumulationStrategy::Shadow, mode, INSTANCES, 2);
    let mut scheduled: Vec<EventRecord> = Vec::new();
    for event in events_for(&net, batch) {
        net.kernel.net_receive(event, &mut scheduled).unwrap();
    }
    net.kernel.flush_events(&mut scheduled).unwrap();
    scheduled.sort_by(|a, b| a.instance.cmp(&b.instance).then(a.time.total_cmp(&b.time)));
    let blocks = net
        .weights
        .iter()
        .map(|w| net.kernel.weight_block(*w).unwrap().to_vec())
        .collect();
    (net.kernel.store().data().to_vec(), blocks, scheduled)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_grouped_equals_serial(raw in prop::collection::vec((0..INSTANCES, any::<u8>()), 1..120)) {
        let batch = batch(&raw);
        let serial = apply(BackendType::Host, EventMode::Immediate, &batch);
        let grouped_host = apply(BackendType::Host, EventMode::Buffered, &batch);
        let grouped_accel = apply(BackendType::Accelerator, EventMode::Buffered, &batch);

        prop_assert_eq!(&serial.0, &grouped_host.0);
        prop_assert_eq!(&serial.1, &grouped_host.1);
        prop_assert_eq!(&serial.2, &grouped_host.2);
        prop_assert_eq!(&serial.0, &grouped_accel.0);
        prop_assert_eq!(&serial.1, &grouped_accel.1);
        prop_assert_eq!(&serial.2, &grouped_accel.2);
    }
}

#[test]
fn test_growth_during_batch_keeps_every_event() {
    let raw: Vec<(usize, u8)> = (0..500).map(|k| (k % INSTANCES, (k * 31 % 251) as u8)).collect();
    let batch = batch(&raw);
    let mut net = network(BackendType::Host, AccumulationStrategy::Shadow, EventMode::Buffered, INSTANCES, 2);
    let mut scheduled: Vec<EventRecord> = Vec::new();
    for event in events_for(&net, &batch) {
        net.kernel.enqueue(event).unwrap();
    }
    let tally = net.kernel.flush_events(&mut scheduled).unwrap();
    assert_eq!(tally.delivered, 500);
    assert_eq!(tally.scheduled as usize, scheduled.len());
    let stats = net.kernel.stats();
    assert!(stats.receive_buffer_growths > 0);
    assert!(stats.send_buffer_growths > 0);
}
