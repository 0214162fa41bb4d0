// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Weight-slot store
//!
//! Each connection owns a fixed-width block of scalars carrying the
//! connection weight and the per-connection event bookkeeping. A block is
//! bound to one target instance when it is connected; grouping deliveries
//! by target instance therefore never shares a block across groups.

use synk_kernel_mechanism::{InstanceId, WeightIndex};

use crate::error::{Result, StorageError};

#[derive(Debug, Clone)]
pub struct WeightStore {
    width: usize,
    values: Vec<f64>,
    owners: Vec<InstanceId>,
}

impl WeightStore {
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 {
            return Err(StorageError::InvalidRowSize(width));
        }
        Ok(Self {
            width,
            values: Vec::new(),
            owners: Vec::new(),
        })
    }

    /// Allocate a block for `target`, with `weight` in slot 0 and the rest zeroed
    pub fn connect(&mut self, target: InstanceId, weight: f64) -> WeightIndex {
        let index = WeightIndex(self.owners.len() as u32);
        let base = self.values.len();
        self.values.resize(base + self.width, 0.0);
        self.values[base] = weight;
        self.owners.push(target);
        index
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    #[inline]
    fn check(&self, index: WeightIndex) -> Result<usize> {
        let i = index.index();
        if i >= self.owners.len() {
            return Err(StorageError::WeightOutOfRange {
                id: index,
                count: self.owners.len(),
            });
        }
        Ok(i)
    }

    pub fn owner(&self, index: WeightIndex) -> Result<InstanceId> {
        Ok(self.owners[self.check(index)?])
    }

    /// Fail unless `index` was connected to `instance`
    pub fn check_owner(&self, index: WeightIndex, instance: InstanceId) -> Result<()> {
        let owner = self.owner(index)?;
        if owner != instance {
            return Err(StorageError::WeightSlotOwnerMismatch {
                weight: index,
                owner,
                requested: instance,
            });
        }
        Ok(())
    }

    pub fn block(&self, index: WeightIndex) -> Result<&[f64]> {
        let i = self.check(index)?;
        Ok(&self.values[i * self.width..(i + 1) * self.width])
    }

    pub fn block_mut(&mut self, index: WeightIndex) -> Result<&mut [f64]> {
        let i = self.check(index)?;
        Ok(&mut self.values[i * self.width..(i + 1) * self.width])
    }

    /// Reset bookkeeping slots, keeping each connection's weight
    pub fn reset_bookkeeping(&mut self) {
        for block in self.values.chunks_exact_mut(self.width) {
            block[1..].iter_mut().for_each(|v| *v = 0.0);
        }
    }
}
