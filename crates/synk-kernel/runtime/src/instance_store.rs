// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Instance Store
//!
//! Flat, strided per-instance storage. Instance `i` owns
//! `data[i*psize .. (i+1)*psize]` and `pdata[i*ppsize .. (i+1)*ppsize]`.
//! `node_indices[i]` is the node the instance contributes to.
//!
//! Point-process stores use the conventional index slot layout:
//! slot 0 = area index into node data, slot 1 = point-process index,
//! slot 2 = self-event queue handle.

use rayon::prelude::*;
use synk_kernel_mechanism::{InstanceId, Mechanism, NodeIndex};

use crate::error::{Result, StorageError};

pub const AREA_DPARAM: usize = 0;
pub const POINT_PROCESS_DPARAM: usize = 1;
pub const NETSEND_DPARAM: usize = 2;

/// Per-instance attachment supplied by whoever builds the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub node: NodeIndex,
    /// Index of the area value in the node data array
    pub area_index: usize,
}

/// AoS instance storage for a single mechanism type
#[derive(Debug, Clone)]
pub struct InstanceStore {
    psize: usize,
    ppsize: usize,
    count: usize,
    /// Point-process index of instance 0
    pnt_offset: usize,
    data: Vec<f64>,
    pdata: Vec<usize>,
    node_indices: Vec<NodeIndex>,
}

impl InstanceStore {
    pub fn new(psize: usize, ppsize: usize, pnt_offset: usize) -> Result<Self> {
        if psize == 0 {
            return Err(StorageError::InvalidRowSize(psize));
        }
        Ok(Self {
            psize,
            ppsize,
            count: 0,
            pnt_offset,
            data: Vec::new(),
            pdata: Vec::new(),
            node_indices: Vec::new(),
        })
    }

    /// Store shaped for mechanism `M`
    pub fn for_mechanism<M: Mechanism>(pnt_offset: usize) -> Result<Self> {
        Self::new(M::PSIZE, M::PPSIZE, pnt_offset)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.data.reserve(capacity * self.psize);
        self.pdata.reserve(capacity * self.ppsize);
        self.node_indices.reserve(capacity);
        self
    }

    /// Append one zeroed instance
    pub fn push(&mut self, attachment: Attachment) -> InstanceId {
        let id = InstanceId(self.count as u32);
        self.data.resize(self.data.len() + self.psize, 0.0);
        let base = self.pdata.len();
        self.pdata.resize(base + self.ppsize, 0);
        if self.ppsize > AREA_DPARAM {
            self.pdata[base + AREA_DPARAM] = attachment.area_index;
        }
        if self.ppsize > POINT_PROCESS_DPARAM {
            self.pdata[base + POINT_PROCESS_DPARAM] = self.pnt_offset + self.count;
        }
        if self.ppsize > NETSEND_DPARAM {
            // One queue handle per instance
            self.pdata[base + NETSEND_DPARAM] = self.count;
        }
        self.node_indices.push(attachment.node);
        self.count += 1;
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn psize(&self) -> usize {
        self.psize
    }

    #[inline]
    pub fn ppsize(&self) -> usize {
        self.ppsize
    }

    #[inline]
    pub fn pnt_offset(&self) -> usize {
        self.pnt_offset
    }

    #[inline]
    fn check(&self, id: InstanceId) -> Result<usize> {
        let i = id.index();
        if i >= self.count {
            return Err(StorageError::InstanceOutOfRange {
                id,
                count: self.count,
            });
        }
        Ok(i)
    }

    pub fn row(&self, id: InstanceId) -> Result<&[f64]> {
        let i = self.check(id)?;
        Ok(&self.data[i * self.psize..(i + 1) * self.psize])
    }

    pub fn row_mut(&mut self, id: InstanceId) -> Result<&mut [f64]> {
        let i = self.check(id)?;
        Ok(&mut self.data[i * self.psize..(i + 1) * self.psize])
    }

    pub fn get(&self, id: InstanceId, slot: usize) -> Result<f64> {
        if slot >= self.psize {
            return Err(StorageError::SlotOutOfRange {
                slot,
                psize: self.psize,
            });
        }
        Ok(self.row(id)?[slot])
    }

    pub fn set(&mut self, id: InstanceId, slot: usize, value: f64) -> Result<()> {
        if slot >= self.psize {
            return Err(StorageError::SlotOutOfRange {
                slot,
                psize: self.psize,
            });
        }
        self.row_mut(id)?[slot] = value;
        Ok(())
    }

    pub fn dparams(&self, id: InstanceId) -> Result<&[usize]> {
        let i = self.check(id)?;
        Ok(&self.pdata[i * self.ppsize..(i + 1) * self.ppsize])
    }

    pub fn node(&self, id: InstanceId) -> Result<NodeIndex> {
        let i = self.check(id)?;
        Ok(self.node_indices[i])
    }

    pub fn node_indices(&self) -> &[NodeIndex] {
        &self.node_indices
    }

    pub fn dparam(&self, id: InstanceId, slot: usize) -> Result<usize> {
        self.dparams(id)?
            .get(slot)
            .copied()
            .ok_or(StorageError::SlotOutOfRange {
                slot,
                psize: self.ppsize,
            })
    }

    pub fn area_index(&self, id: InstanceId) -> Result<usize> {
        self.dparam(id, AREA_DPARAM)
    }

    pub fn point_process(&self, id: InstanceId) -> Result<usize> {
        self.dparam(id, POINT_PROCESS_DPARAM)
    }

    pub fn queue_handle(&self, id: InstanceId) -> Result<usize> {
        self.dparam(id, NETSEND_DPARAM)
    }

    /// Map a point-process index back to the instance that owns it
    pub fn instance_for_point_process(&self, index: usize) -> Result<InstanceId> {
        if index < self.pnt_offset || index >= self.pnt_offset + self.count {
            return Err(StorageError::PointProcessOutOfRange {
                index,
                offset: self.pnt_offset,
                count: self.count,
            });
        }
        Ok(InstanceId((index - self.pnt_offset) as u32))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.psize)
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.data.chunks_exact_mut(self.psize)
    }

    pub fn par_rows_mut(&mut self) -> impl IndexedParallelIterator<Item = &mut [f64]> {
        self.data.par_chunks_exact_mut(self.psize)
    }

    /// Rows together with the index data needed to scatter contributions
    pub fn split_mut(&mut self) -> (&mut [f64], &[usize], &[NodeIndex]) {
        (&mut self.data, &self.pdata, &self.node_indices)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}
