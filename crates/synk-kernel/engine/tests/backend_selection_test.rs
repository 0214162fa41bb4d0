// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Backend Selection Tests
//!
//! Validates that auto-selection picks the backend by population size and
//! honors force flags.

use synk_kernel_engine::*;
use synk_kernel_mechanism::AmpaModel;

#[test]
fn test_small_population_selects_host() {
    let config = BackendConfig::default();
    let decision = select_backend(1_000, &config);
    assert_eq!(decision.backend_type, BackendType::Host);
    assert!(decision.reason.contains("< threshold"));
}

#[test]
fn test_threshold_boundary() {
    let config = BackendConfig::default();
    let below = select_backend(config.accelerator_instance_threshold - 1, &config);
    assert_eq!(below.backend_type, BackendType::Host);
    let at = select_backend(config.accelerator_instance_threshold, &config);
    assert_eq!(at.backend_type, BackendType::Accelerator);
}

#[test]
fn test_force_flags() {
    let config = BackendConfig {
        force_host: true,
        ..Default::default()
    };
    let decision = select_backend(10_000_000, &config);
    assert_eq!(decision.backend_type, BackendType::Host);
    assert!(decision.reason.contains("Forced host"));

    let config = BackendConfig {
        force_accelerator: true,
        ..Default::default()
    };
    assert_eq!(
        select_backend(1, &config).backend_type,
        BackendType::Accelerator
    );
}

#[test]
fn test_requested_type_translates_to_flags() {
    let host = BackendConfig::for_requested(BackendType::Host, 50);
    assert!(host.force_host && !host.force_accelerator);
    let auto = BackendConfig::for_requested(BackendType::Auto, 50);
    assert!(!auto.force_host && !auto.force_accelerator);
    assert_eq!(select_backend(50, &auto).backend_type, BackendType::Accelerator);
}

#[test]
fn test_created_backend_reports_its_type() {
    let host = create_backend::<AmpaModel>(BackendType::Host);
    assert_eq!(host.backend_type(), BackendType::Host);
    assert!(!host.uses_device_mirror());
    let accel = create_backend::<AmpaModel>(BackendType::Accelerator);
    assert_eq!(accel.backend_type(), BackendType::Accelerator);
    assert!(accel.uses_device_mirror());
}
