// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mechanism registry
//!
//! Maps mechanism names to type ids and keeps the slot metadata collaborators
//! need: row sizes, index-slot semantics, weight width and state/derivative
//! slot pairs. Malformed registrations abort with an `EngineError`.

use ahash::AHashMap;
use synk_kernel_mechanism::{DparamSemantic, Mechanism, MechanismKind, StateSlot};
use synk_kernel_runtime::InstanceStore;
use tracing::info;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MechanismTypeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub kind: MechanismKind,
    pub psize: usize,
    pub ppsize: usize,
    pub dparam_semantics: Vec<DparamSemantic>,
    pub weight_width: usize,
    pub state_slots: Vec<StateSlot>,
    pub net_receive_buffering: bool,
    pub net_send_buffering: bool,
}

impl Registration {
    /// Metadata for mechanism `M`
    pub fn of<M: Mechanism>(buffered: bool) -> Self {
        Self {
            name: M::NAME.to_string(),
            kind: M::KIND,
            psize: M::PSIZE,
            ppsize: M::PPSIZE,
            dparam_semantics: M::dparam_semantics().to_vec(),
            weight_width: M::WEIGHT_WIDTH,
            state_slots: M::state_slots().to_vec(),
            net_receive_buffering: buffered,
            net_send_buffering: buffered,
        }
    }
}

#[derive(Debug, Default)]
pub struct MechanismRegistry {
    by_name: AHashMap<String, MechanismTypeId>,
    entries: Vec<Registration>,
}

impl MechanismRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: Registration) -> Result<MechanismTypeId> {
        if self.by_name.contains_key(&registration.name) {
            return Err(EngineError::DuplicateMechanism(registration.name));
        }
        if registration.dparam_semantics.len() != registration.ppsize {
            return Err(EngineError::SlotCountMismatch {
                mechanism: registration.name.clone(),
                expected_psize: registration.psize,
                expected_ppsize: registration.dparam_semantics.len(),
                actual_psize: registration.psize,
                actual_ppsize: registration.ppsize,
            });
        }
        let id = MechanismTypeId(self.entries.len() as u32);
        info!(
            target: "synk-kernel-engine",
            "Registered mechanism {} as type {} (psize={}, ppsize={}, kind={})",
            registration.name,
            id.0,
            registration.psize,
            registration.ppsize,
            registration.kind
        );
        self.by_name.insert(registration.name.clone(), id);
        self.entries.push(registration);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Result<MechanismTypeId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownMechanism(name.to_string()))
    }

    pub fn get(&self, id: MechanismTypeId) -> Result<&Registration> {
        self.entries
            .get(id.0 as usize)
            .ok_or_else(|| EngineError::UnknownMechanism(format!("type {}", id.0)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail unless `store` is shaped as registered
    pub fn check_store(&self, id: MechanismTypeId, store: &InstanceStore) -> Result<()> {
        let reg = self.get(id)?;
        if reg.psize != store.psize() || reg.ppsize != store.ppsize() {
            return Err(EngineError::SlotCountMismatch {
                mechanism: reg.name.clone(),
                expected_psize: reg.psize,
                expected_ppsize: reg.ppsize,
                actual_psize: store.psize(),
                actual_ppsize: store.ppsize(),
            });
        }
        Ok(())
    }
}
