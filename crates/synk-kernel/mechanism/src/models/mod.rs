// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Mechanism Models
//!
//! ## Adding a New Mechanism
//!
//! 1. Create `src/models/your_mechanism.rs`
//! 2. Implement `Mechanism` and `ModelParameters`
//! 3. Add tests
//! 4. Export in `mod.rs`

pub mod ampa;
pub mod traits;

pub use ampa::{AmpaGlobals, AmpaModel, AmpaParameters};
pub use traits::{
    advance_delivery_clock, DparamSemantic, Mechanism, MechanismKind, ModelParameters,
    NetReceiveAction, SelfSend, StateSlot, Transition,
};
