// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Current linearization against membrane voltage
//!
//! Conductance is taken from a one-sided finite difference of the current
//! law rather than its analytic derivative, so it stays consistent with the
//! current expression whatever its algebraic form:
//!
//! ```text
//! g = (I(v + ε) - I(v)) / ε        ε = 1e-3 (voltage units)
//! ```

/// Finite-difference step in voltage units
pub const LINEARIZATION_EPSILON: f64 = 1.0e-3;

/// Point-process contributions are per-area: contribution × 1e2 / area
pub const POINT_PROCESS_AREA_SCALE: f64 = 1.0e2;

/// Linearized current/conductance pair for one instance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Linearization {
    /// dI/dv estimate
    pub conductance: f64,
    /// I(v)
    pub current: f64,
}

impl Linearization {
    /// Scale both terms by a geometric factor
    #[inline(always)]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            conductance: self.conductance * factor,
            current: self.current * factor,
        }
    }
}

/// Linearize `current_at` around `v`.
///
/// The current is evaluated at `v + ε` first and at `v` second, so a current
/// law that records its outputs into instance slots leaves the values for `v`.
#[inline(always)]
pub fn linearize<F>(mut current_at: F, v: f64) -> Linearization
where
    F: FnMut(f64) -> f64,
{
    let shifted = current_at(v + LINEARIZATION_EPSILON);
    let current = current_at(v);
    Linearization {
        conductance: (shifted - current) / LINEARIZATION_EPSILON,
        current,
    }
}

/// Area factor applied to point-process contributions before scatter
#[inline(always)]
pub fn area_factor(area: f64) -> f64 {
    POINT_PROCESS_AREA_SCALE / area
}
