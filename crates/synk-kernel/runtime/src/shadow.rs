// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shadow accumulators
//!
//! One private (rhs, d) pair per instance. The current phase writes its own
//! entries without touching shared nodes; `reduce_into` then folds them into
//! the node matrix sequentially, in instance order.

use synk_kernel_mechanism::NodeIndex;

use crate::error::{Result, StorageError};
use crate::node_matrix::NodeMatrix;

#[derive(Debug, Clone, Default)]
pub struct ShadowAccumulator {
    rhs: Vec<f64>,
    d: Vec<f64>,
}

impl ShadowAccumulator {
    pub fn new(instance_count: usize) -> Self {
        Self {
            rhs: vec![0.0; instance_count],
            d: vec![0.0; instance_count],
        }
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn resize(&mut self, instance_count: usize) {
        self.rhs.resize(instance_count, 0.0);
        self.d.resize(instance_count, 0.0);
    }

    #[inline]
    pub fn record(&mut self, instance: usize, current: f64, conductance: f64) {
        self.rhs[instance] = current;
        self.d[instance] = conductance;
    }

    /// Paired mutable views, for parallel writers that each own one index
    pub fn slots_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.rhs, &mut self.d)
    }

    pub fn reduce_into(&self, nodes: &[NodeIndex], matrix: &mut NodeMatrix) -> Result<()> {
        if nodes.len() != self.rhs.len() {
            return Err(StorageError::ShadowSizeMismatch {
                expected: nodes.len(),
                actual: self.rhs.len(),
            });
        }
        for ((node, rhs), d) in nodes.iter().zip(&self.rhs).zip(&self.d) {
            matrix.scatter(*node, *rhs, *d)?;
        }
        Ok(())
    }
}
