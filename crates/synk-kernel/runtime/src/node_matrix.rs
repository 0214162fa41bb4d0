// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared per-node linear-system accumulators
//!
//! `rhs` and `d` are shared by every instance attached to a node. They are
//! atomics so that data-parallel phases can accumulate with `fetch_add`;
//! serial phases go through `&mut self` and never contend.

use std::sync::atomic::Ordering;

use atomic_float::AtomicF64;
use synk_kernel_mechanism::NodeIndex;

use crate::error::{Result, StorageError};

/// Voltage, node data and linear-system accumulators for a set of nodes
#[derive(Debug)]
pub struct NodeMatrix {
    voltage: Vec<f64>,
    /// Auxiliary node data (areas); addressed by instance index slots
    node_data: Vec<f64>,
    rhs: Vec<AtomicF64>,
    d: Vec<AtomicF64>,
}

impl NodeMatrix {
    pub fn new(node_count: usize, resting_voltage: f64) -> Self {
        Self {
            voltage: vec![resting_voltage; node_count],
            node_data: Vec::new(),
            rhs: (0..node_count).map(|_| AtomicF64::new(0.0)).collect(),
            d: (0..node_count).map(|_| AtomicF64::new(0.0)).collect(),
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.voltage.len()
    }

    /// Store an area value and return its node-data index
    pub fn push_area(&mut self, area: f64) -> usize {
        self.node_data.push(area);
        self.node_data.len() - 1
    }

    #[inline]
    pub fn area(&self, index: usize) -> Result<f64> {
        self.node_data
            .get(index)
            .copied()
            .ok_or(StorageError::AreaOutOfRange {
                index,
                len: self.node_data.len(),
            })
    }

    pub fn node_data(&self) -> &[f64] {
        &self.node_data
    }

    #[inline]
    fn check(&self, node: NodeIndex) -> Result<usize> {
        let i = node.index();
        if i >= self.voltage.len() {
            return Err(StorageError::NodeOutOfRange {
                id: node,
                count: self.voltage.len(),
            });
        }
        Ok(i)
    }

    #[inline]
    pub fn voltage(&self, node: NodeIndex) -> Result<f64> {
        Ok(self.voltage[self.check(node)?])
    }

    pub fn voltages(&self) -> &[f64] {
        &self.voltage
    }

    pub fn set_voltage(&mut self, node: NodeIndex, v: f64) -> Result<()> {
        let i = self.check(node)?;
        self.voltage[i] = v;
        Ok(())
    }

    pub fn rhs(&self, node: NodeIndex) -> Result<f64> {
        Ok(self.rhs[self.check(node)?].load(Ordering::Relaxed))
    }

    pub fn d(&self, node: NodeIndex) -> Result<f64> {
        Ok(self.d[self.check(node)?].load(Ordering::Relaxed))
    }

    /// Zero the accumulators before a current phase
    pub fn clear_contributions(&mut self) {
        for (rhs, d) in self.rhs.iter_mut().zip(self.d.iter_mut()) {
            *rhs = AtomicF64::new(0.0);
            *d = AtomicF64::new(0.0);
        }
    }

    /// Serial scatter: `rhs -= current`, `d += conductance`
    pub fn scatter(&mut self, node: NodeIndex, current: f64, conductance: f64) -> Result<()> {
        let i = self.check(node)?;
        let rhs = &self.rhs[i];
        rhs.store(rhs.load(Ordering::Relaxed) - current, Ordering::Relaxed);
        let d = &self.d[i];
        d.store(d.load(Ordering::Relaxed) + conductance, Ordering::Relaxed);
        Ok(())
    }

    /// Concurrent scatter through atomic accumulation
    pub fn scatter_atomic(&self, node: NodeIndex, current: f64, conductance: f64) -> Result<()> {
        let i = self.check(node)?;
        self.rhs[i].fetch_sub(current, Ordering::Relaxed);
        self.d[i].fetch_add(conductance, Ordering::Relaxed);
        Ok(())
    }
}
