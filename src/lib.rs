// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synk - event-driven synapse mechanism kernels
//!
//! Synk advances populations of kinetic synapse instances with exact
//! exponential integration, linearizes their membrane current for an
//! external voltage solver, and delivers spike events through buffered,
//! regrouped paths that are safe for concurrent producers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use synk::prelude::*;
//!
//! let config = synk::config::load_config(None, None)?;
//! let mut network = AmpaNetworkBuilder::new(config).instances(4).build()?;
//! network.spike(0, 0.0)?;
//! network.spike(0, 0.1)?;
//! let tstop = network.tstop;
//! network.simulation.run_until(tstop, |sim| {
//!     println!("{:.3} {:?}", sim.t(), sim.kernel().state(InstanceId(0), ampa::slot::G));
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  synk-config / synk-observability                       │
//! │  (TOML + overrides, logging)                            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  synk-kernel-mechanism                                  │
//! │  (types, exact integrator, linearization, AMPA model)   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  synk-kernel-runtime                                    │
//! │  (instance rows, weight blocks, node accumulators)      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  synk-kernel-engine                                     │
//! │  (event buffers, host/accelerator backends, driver)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use synk_config as config;
pub use synk_kernel_engine as engine;
pub use synk_kernel_mechanism as mechanism;
pub use synk_kernel_runtime as runtime;
pub use synk_observability as observability;

pub mod builder;

pub use builder::{
    ampa_parameters, kernel_config, resolve_backend, AmpaNetwork, AmpaNetworkBuilder, BuildError,
};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::builder::{AmpaNetwork, AmpaNetworkBuilder, BuildError};
    pub use synk_config::SynkConfig;
    pub use synk_kernel_engine::{
        AccumulationStrategy, BackendType, EventMode, KernelConfig, KernelStats, MechanismKernel,
        SelfEventSink, Simulation, TimeQueue,
    };
    pub use synk_kernel_mechanism::models::ampa;
    pub use synk_kernel_mechanism::{
        AmpaModel, AmpaParameters, EventRecord, InstanceId, Mechanism, NodeIndex, WeightIndex,
    };
    pub use synk_kernel_runtime::{Attachment, InstanceStore, NodeMatrix};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let _instance = InstanceId(0);
        assert_eq!(AmpaModel::NAME, "AMPA_S");
    }
}
