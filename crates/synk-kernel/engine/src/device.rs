// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Device mirror of a plain-old-data block
//!
//! Holds the byte image an accelerator reads. Every upload bumps the
//! generation so readers can tell a stale copy from a fresh one.

use bytemuck::Pod;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Default)]
pub struct DeviceMirror {
    bytes: Vec<u8>,
    generation: u64,
}

impl DeviceMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload<T: Pod>(&mut self, value: &T) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytemuck::bytes_of(value));
        self.generation += 1;
    }

    pub fn read<T: Pod>(&self) -> Result<T> {
        let expected = core::mem::size_of::<T>();
        if self.bytes.len() != expected {
            return Err(EngineError::DeviceMirrorLayout {
                expected,
                actual: self.bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(&self.bytes))
    }

    /// Number of uploads so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_read_and_generation() {
        let mut mirror = DeviceMirror::new();
        assert!(mirror.read::<[f64; 2]>().is_err());
        mirror.upload(&[1.5f64, -2.0]);
        mirror.upload(&[3.0f64, 4.0]);
        assert_eq!(mirror.generation(), 2);
        assert_eq!(mirror.read::<[f64; 2]>().unwrap(), [3.0, 4.0]);
        assert_eq!(
            mirror.read::<[f64; 3]>(),
            Err(EngineError::DeviceMirrorLayout {
                expected: 24,
                actual: 16
            })
        );
    }
}
