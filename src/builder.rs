// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Build AMPA simulations from a [`SynkConfig`].
//!
//! The engine never sees configuration strings; everything is converted to
//! kernel types here.

use synk_config::{validate_config, AmpaConfig, ConfigError, SynkConfig};
use synk_kernel_engine::{
    create_backend, select_backend, AccumulationStrategy, BackendConfig, BackendDecision,
    BackendType, EngineError, EventMode, KernelConfig, MechanismKernel, Simulation,
};
use synk_kernel_mechanism::{AmpaModel, AmpaParameters, InstanceId, NodeIndex, WeightIndex};
use synk_kernel_runtime::{Attachment, InstanceStore, NodeMatrix, StorageError};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Network needs at least one {0}")]
    Empty(&'static str),
}

impl From<StorageError> for BuildError {
    fn from(err: StorageError) -> Self {
        BuildError::Engine(err.into())
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

pub fn ampa_parameters(config: &AmpaConfig) -> AmpaParameters {
    AmpaParameters {
        alpha: config.alpha,
        beta: config.beta,
        cdur: config.cdur,
        erev: config.erev,
        ron0: config.ron0,
        roff0: config.roff0,
    }
}

/// Resolve `backend.kind` (possibly `auto`) for a population size
pub fn resolve_backend(config: &SynkConfig, instance_count: usize) -> Result<BackendDecision> {
    let requested: BackendType = config.backend.kind.parse()?;
    let selection =
        BackendConfig::for_requested(requested, config.backend.accelerator_instance_threshold);
    Ok(select_backend(instance_count, &selection))
}

/// Kernel settings for a resolved backend; `auto` accumulation follows the backend
pub fn kernel_config(config: &SynkConfig, backend: BackendType) -> Result<KernelConfig> {
    let accumulation = if config.backend.accumulation.eq_ignore_ascii_case("auto") {
        AccumulationStrategy::default_for(backend)
    } else {
        config.backend.accumulation.parse()?
    };
    let event_mode: EventMode = config.events.mode.parse()?;

    Ok(KernelConfig {
        celsius: config.simulation.celsius,
        dt: config.simulation.dt,
        event_mode,
        accumulation,
        record_cell_state: config.logging.record_cell_state,
        receive_capacity: config.events.receive_capacity,
        send_capacity: config.events.send_capacity,
    })
}

/// An initialized AMPA simulation with one connection per instance
pub struct AmpaNetwork {
    pub simulation: Simulation<AmpaModel>,
    pub weights: Vec<WeightIndex>,
    pub decision: BackendDecision,
    pub tstop: f64,
}

impl AmpaNetwork {
    /// Queue an external spike onto instance `instance`'s connection
    pub fn spike(&mut self, instance: usize, time: f64) -> Result<()> {
        let id = InstanceId(instance as u32);
        let weight = *self.weights.get(instance).ok_or(StorageError::InstanceOutOfRange {
            id,
            count: self.weights.len(),
        })?;
        self.simulation.schedule_activation(id, weight, time)?;
        Ok(())
    }
}

pub struct AmpaNetworkBuilder {
    config: SynkConfig,
    instances: usize,
    node_count: usize,
    area: f64,
    voltage: f64,
    weight: f64,
}

impl AmpaNetworkBuilder {
    pub fn new(config: SynkConfig) -> Self {
        Self {
            config,
            instances: 1,
            node_count: 1,
            area: 100.0,
            voltage: -65.0,
            weight: 1.0,
        }
    }

    pub fn instances(mut self, instances: usize) -> Self {
        self.instances = instances;
        self
    }

    /// Instances are spread round-robin over `node_count` nodes
    pub fn nodes(mut self, node_count: usize) -> Self {
        self.node_count = node_count;
        self
    }

    /// Membrane area of every node (um^2)
    pub fn area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    /// Held membrane voltage of every node (mV)
    pub fn voltage(mut self, voltage: f64) -> Self {
        self.voltage = voltage;
        self
    }

    /// Weight of each instance's connection
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn build(self) -> Result<AmpaNetwork> {
        validate_config(&self.config)?;
        if self.instances == 0 {
            return Err(BuildError::Empty("instance"));
        }
        if self.node_count == 0 {
            return Err(BuildError::Empty("node"));
        }

        let decision = resolve_backend(&self.config, self.instances)?;
        info!(
            target: "synk",
            "Backend {} for {} instances: {}",
            decision.backend_type,
            self.instances,
            decision.reason
        );
        let kernel_config = kernel_config(&self.config, decision.backend_type)?;

        let mut nodes = NodeMatrix::new(self.node_count, self.voltage);
        let areas: Vec<usize> = (0..self.node_count)
            .map(|_| nodes.push_area(self.area))
            .collect();

        let mut store =
            InstanceStore::for_mechanism::<AmpaModel>(0)?.with_capacity(self.instances);
        for i in 0..self.instances {
            let n = i % self.node_count;
            store.push(Attachment {
                node: NodeIndex(n as u32),
                area_index: areas[n],
            });
        }

        let mut kernel = MechanismKernel::new(
            ampa_parameters(&self.config.ampa),
            store,
            kernel_config,
            create_backend::<AmpaModel>(decision.backend_type),
        )?;
        let weights = (0..self.instances)
            .map(|i| kernel.connect(InstanceId(i as u32), self.weight))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut simulation = Simulation::new(kernel, nodes)?;
        simulation.init()?;

        Ok(AmpaNetwork {
            simulation,
            weights,
            decision,
            tstop: self.config.simulation.tstop,
        })
    }
}
