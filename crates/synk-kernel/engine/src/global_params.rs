// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Global Parameter Block
//!
//! One block of rate constants and derived closed-form constants per
//! mechanism type.
//!
//! ```text
//! create ──► refresh ──► snapshot (read-only, per phase) ──► ... ──► destroy
//!              ▲   │
//!              │   └─► device mirror (when attached)
//!        set_parameters
//! ```
//!
//! Phases never read the block directly; they receive a `snapshot()` copy
//! taken during the serial part of the step.

use synk_kernel_mechanism::{Mechanism, ModelParameters};
use tracing::{debug, info};

use crate::device::DeviceMirror;
use crate::error::{EngineError, Result};

#[derive(Debug)]
pub struct GlobalParameterBlock<M: Mechanism> {
    canonical: M::Parameters,
    celsius: f64,
    dt: f64,
    derived: Option<M::Globals>,
    allocated: bool,
    mirror: Option<DeviceMirror>,
}

impl<M: Mechanism> GlobalParameterBlock<M> {
    /// Unallocated block holding the canonical source values
    pub fn new(canonical: M::Parameters, celsius: f64, dt: f64) -> Self {
        Self {
            canonical,
            celsius,
            dt,
            derived: None,
            allocated: false,
            mirror: None,
        }
    }

    /// Allocate and derive for the first time
    pub fn create(&mut self) -> Result<()> {
        if self.allocated {
            return Err(EngineError::GlobalsAlreadyAllocated { mechanism: M::NAME });
        }
        self.canonical.validate()?;
        self.allocated = true;
        info!(target: "synk-kernel-engine", "Allocated global block for {}", M::NAME);
        self.refresh()
    }

    /// Recompute derived values from canonical ones and mirror them
    pub fn refresh(&mut self) -> Result<()> {
        if !self.allocated {
            return Err(EngineError::GlobalsNotAllocated { mechanism: M::NAME });
        }
        let globals = M::derive_globals(&self.canonical, self.celsius, self.dt)?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.upload(&globals);
        }
        self.derived = Some(globals);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<M::Globals> {
        self.derived
            .filter(|_| self.allocated)
            .ok_or(EngineError::GlobalsNotAllocated { mechanism: M::NAME })
    }

    pub fn destroy(&mut self) {
        if self.allocated {
            debug!(target: "synk-kernel-engine", "Destroyed global block for {}", M::NAME);
        }
        self.allocated = false;
        self.derived = None;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.clear();
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Replace canonical values; takes effect at the next refresh
    pub fn set_parameters(&mut self, canonical: M::Parameters) -> Result<()> {
        canonical.validate()?;
        self.canonical = canonical;
        Ok(())
    }

    pub fn parameters(&self) -> &M::Parameters {
        &self.canonical
    }

    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn celsius(&self) -> f64 {
        self.celsius
    }

    /// Start mirroring to device memory; uploads immediately if allocated
    pub fn attach_mirror(&mut self) {
        let mut mirror = DeviceMirror::new();
        if let Some(globals) = self.derived.as_ref() {
            mirror.upload(globals);
        }
        self.mirror = Some(mirror);
    }

    pub fn mirror(&self) -> Option<&DeviceMirror> {
        self.mirror.as_ref()
    }

    /// Snapshot as seen by the device
    pub fn device_snapshot(&self) -> Result<M::Globals> {
        match self.mirror.as_ref() {
            Some(mirror) if self.allocated => mirror.read(),
            Some(_) => Err(EngineError::GlobalsNotAllocated { mechanism: M::NAME }),
            None => self.snapshot(),
        }
    }
}
