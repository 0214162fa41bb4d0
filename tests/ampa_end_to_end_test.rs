// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end runs built from configuration files

use std::fs::File;
use std::io::Write;

use synk::config::load_config;
use synk::mechanism::models::ampa::{slot, weight_slot};
use synk::prelude::*;
use tempfile::tempdir;

fn config_from(toml: &str) -> SynkConfig {
    let dir = tempdir().unwrap();
    let path = dir.path().join("synk_configuration.toml");
    let mut file = File::create(&path).unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    load_config(Some(&path), None).unwrap()
}

#[test]
fn test_retriggered_activation_yields_one_deactivation() {
    let config = config_from(
        r#"
        [simulation]
        dt = 0.025
        tstop = 1.0

        [backend]
        kind = "host"
        "#,
    );
    let mut network = AmpaNetworkBuilder::new(config).build().unwrap();
    network.spike(0, 0.0).unwrap();
    network.spike(0, 0.1).unwrap();

    let weight = network.weights[0];
    let tstop = network.tstop;
    let mut on_trace = Vec::new();
    network
        .simulation
        .run_until(tstop, |sim| {
            let block = sim.kernel().weight_block(weight).unwrap();
            on_trace.push((sim.t(), block[weight_slot::ON], block[weight_slot::NSPIKE]));
        })
        .unwrap();

    for &(t, on, nspike) in &on_trace {
        if t > 0.05 && t < 0.375 {
            assert_eq!(on, 1.0, "still active at t={t}");
        }
        if t > 0.45 {
            assert_eq!(on, 0.0, "released at t={t}");
            assert_eq!(nspike, 2.0);
        }
    }

    let stats = network.simulation.kernel().stats();
    assert_eq!(stats.activations, 1);
    assert_eq!(stats.retriggers, 1);
    assert_eq!(stats.deactivations, 1);
    assert_eq!(stats.stale_events, 1);
    assert_eq!(stats.self_events_scheduled, 2);
    assert_eq!(stats.steps, 40);
}

#[test]
fn test_conductance_decays_after_release() {
    let config = config_from("[simulation]\ntstop = 6.0\n");
    let mut network = AmpaNetworkBuilder::new(config)
        .voltage(-70.0)
        .build()
        .unwrap();
    network.spike(0, 0.0).unwrap();

    let tstop = network.tstop;
    let mut g_trace = Vec::new();
    network
        .simulation
        .run_until(tstop, |sim| {
            g_trace.push(sim.kernel().state(InstanceId(0), slot::G).unwrap());
        })
        .unwrap();

    let (peak_step, peak) = g_trace
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |best, (k, g)| if g > best.1 { (k, g) } else { best });
    assert!(peak > 0.0);
    // Peak at the end of the 0.3 ms pulse (step 12 of dt = 0.025)
    assert!((11..=13).contains(&peak_step), "peak at step {peak_step}");
    assert!(*g_trace.last().unwrap() < 0.5 * peak);

    // Excitatory current is inward at -70 mV with Erev = 0
    let i = network.simulation.kernel().state(InstanceId(0), slot::I).unwrap();
    assert!(i < 0.0);
}

#[test]
fn test_host_and_accelerator_agree_from_config() {
    let run = |kind: &str| {
        let config = config_from(&format!(
            "[simulation]\ntstop = 1.5\n[backend]\nkind = \"{kind}\"\n[events]\nreceive_capacity = 2\nsend_capacity = 2\n"
        ));
        let mut network = AmpaNetworkBuilder::new(config)
            .instances(6)
            .nodes(2)
            .build()
            .unwrap();
        for (k, t) in [0.0, 0.05, 0.05, 0.2, 0.6, 0.65].into_iter().enumerate() {
            network.spike(k % 6, t).unwrap();
            network.spike((k + 3) % 6, t).unwrap();
        }
        let tstop = network.tstop;
        network.simulation.run_until(tstop, |_| {}).unwrap();

        let kernel = network.simulation.kernel();
        let states: Vec<[f64; 3]> = (0..6)
            .map(|i| {
                let id = InstanceId(i);
                [
                    kernel.state(id, slot::RON).unwrap(),
                    kernel.state(id, slot::ROFF).unwrap(),
                    kernel.state(id, slot::G).unwrap(),
                ]
            })
            .collect();
        (network.decision.backend_type, states, kernel.stats())
    };

    let (host_type, host_states, host_stats) = run("host");
    let (accel_type, accel_states, accel_stats) = run("accelerator");

    assert_eq!(host_type, BackendType::Host);
    assert_eq!(accel_type, BackendType::Accelerator);
    assert_eq!(host_states, accel_states);
    assert_eq!(host_stats.events_delivered, accel_stats.events_delivered);
    assert_eq!(host_stats.deactivations, accel_stats.deactivations);
}

#[test]
fn test_immediate_mode_matches_buffered() {
    let run = |mode: &str| {
        let config = config_from(&format!(
            "[simulation]\ntstop = 1.0\n[backend]\nkind = \"host\"\n[events]\nmode = \"{mode}\"\n"
        ));
        let mut network = AmpaNetworkBuilder::new(config).instances(2).build().unwrap();
        for t in [0.0, 0.125, 0.2] {
            network.spike(0, t).unwrap();
        }
        network.spike(1, 0.1).unwrap();
        let tstop = network.tstop;
        network.simulation.run_until(tstop, |_| {}).unwrap();
        let kernel = network.simulation.kernel();
        (0..2)
            .flat_map(|i| kernel.store().row(InstanceId(i)).unwrap().to_vec())
            .collect::<Vec<f64>>()
    };

    assert_eq!(run("buffered"), run("immediate"));
}
