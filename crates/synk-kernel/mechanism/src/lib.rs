// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Synk Mechanism Kernels (Platform-Agnostic)
//!
//! Per-instance numerics, with no storage or threading:
//! - **Types**: ids, event records, errors
//! - **Integrator**: exact exponential update for linear channels
//! - **Linearize**: finite-difference current/conductance
//! - **Models**: the `Mechanism` trait and the AMPA synapse

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod integrator;
pub mod linearize;
pub mod models;
pub mod types;

pub use integrator::{exact_exponential_step, LinearChannel};
pub use linearize::{area_factor, linearize, Linearization, LINEARIZATION_EPSILON};
pub use models::{
    AmpaGlobals, AmpaModel, AmpaParameters, DparamSemantic, Mechanism, MechanismKind,
    ModelParameters, NetReceiveAction, SelfSend, StateSlot, Transition,
};
pub use types::{
    Error, EventRecord, InstanceId, MechanismError, NodeIndex, Result, SendRecord, WeightIndex,
    EXTERNAL_ACTIVATION_FLAG,
};
