// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Exact Exponential Integration
//!
//! Closed-form per-step update for linear kinetic channels.
//!
//! ```text
//! For a state obeying  dx/dt = a·x + b  with a, b constant over the step:
//!
//!     x(t + dt) = x + (1 - exp(a·dt)) · (-b/a - x)
//!
//! -b/a is the steady state the channel relaxes toward.
//! ```
//!
//! The update is exact for step-constant `a`, `b`, so no iteration or
//! convergence check is needed. `a == 0` is a model-definition fault and is
//! rejected when parameters are validated, never per step.

/// Advance `x` by one step of length `dt` under `dx/dt = a·x + b`.
#[inline(always)]
pub fn exact_exponential_step(x: f64, a: f64, b: f64, dt: f64) -> f64 {
    x + (1.0 - (a * dt).exp()) * (-b / a - x)
}

/// A linear channel `dx/dt = a·x + b` with step-constant coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearChannel {
    pub a: f64,
    pub b: f64,
}

impl LinearChannel {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Channel relaxing toward `target` with time constant `tau`
    pub fn relaxation(target: f64, tau: f64) -> Self {
        Self {
            a: -1.0 / tau,
            b: target / tau,
        }
    }

    /// Pure decay at `rate`
    pub fn decay(rate: f64) -> Self {
        Self { a: -rate, b: 0.0 }
    }

    #[inline(always)]
    pub fn step(&self, x: f64, dt: f64) -> f64 {
        exact_exponential_step(x, self.a, self.b, dt)
    }

    #[inline(always)]
    pub fn derivative(&self, x: f64) -> f64 {
        self.a * x + self.b
    }

    #[inline(always)]
    pub fn steady_state(&self) -> f64 {
        -self.b / self.a
    }

    /// Implicit (backward Euler) diagonal solve of a derivative estimate
    #[inline(always)]
    pub fn implicit_diagonal_solve(&self, derivative: f64, dt: f64) -> f64 {
        derivative / (1.0 - dt * self.a)
    }
}

/// Decay an amplitude at `rate` over `elapsed` time units
#[inline(always)]
pub fn decay_amplitude(amplitude: f64, rate: f64, elapsed: f64) -> f64 {
    amplitude * (-rate * elapsed).exp()
}

/// Analytic value, after `elapsed`, of a quantity relaxing from `x` toward `target` with time constant `tau`
#[inline(always)]
pub fn relax_toward(target: f64, x: f64, tau: f64, elapsed: f64) -> f64 {
    target + (x - target) * (-elapsed / tau).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rk4(channel: &LinearChannel, x0: f64, dt: f64, substeps: usize) -> f64 {
        let h = dt / substeps as f64;
        let mut x = x0;
        for _ in 0..substeps {
            let k1 = channel.derivative(x);
            let k2 = channel.derivative(x + 0.5 * h * k1);
            let k3 = channel.derivative(x + 0.5 * h * k2);
            let k4 = channel.derivative(x + h * k3);
            x += h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        }
        x
    }

    #[test]
    fn test_step_matches_reference_update() {
        // Ron channel: tau = 1/(0.94+0.18), target = synon * Rinf
        let rtau = 1.0 / (0.94 + 0.18);
        let rinf = 0.94 / (0.94 + 0.18);
        let synon = 2.0;
        let ron = 0.25;
        let dt: f64 = 0.025;

        let expected = ron
            + (1.0 - (dt * (-1.0 / rtau)).exp()) * (-(synon * rinf / rtau) / (-1.0 / rtau) - ron);
        let channel = LinearChannel::relaxation(synon * rinf, rtau);
        assert!((channel.step(ron, dt) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_decay_channel_goes_to_zero() {
        let channel = LinearChannel::decay(0.18);
        assert_eq!(channel.steady_state(), 0.0);
        let x = channel.step(1.0, 1000.0);
        assert!(x.abs() < 1e-60);
    }

    #[test]
    fn test_converges_to_fine_rk4() {
        let channel = LinearChannel::new(-1.12, 0.7);
        let exact = channel.step(0.3, 0.5);
        let numeric = rk4(&channel, 0.3, 0.5, 10_000);
        assert!((exact - numeric).abs() < 1e-12);
    }

    #[test]
    fn test_implicit_solve_matches_backward_euler() {
        let channel = LinearChannel::decay(0.18);
        let dt = 0.1;
        let x = 2.0;
        let d = channel.implicit_diagonal_solve(channel.derivative(x), dt);
        // Backward Euler: x1 = x / (1 + dt*beta)  =>  (x1 - x)/dt == d
        let x1 = x / (1.0 + dt * 0.18);
        assert!(((x1 - x) / dt - d).abs() < 1e-12);
    }

    #[test]
    fn test_relax_toward_matches_channel_step() {
        let tau = 0.9;
        let target = 0.4;
        let channel = LinearChannel::relaxation(target, tau);
        let a = channel.step(1.5, 0.3);
        let b = relax_toward(target, 1.5, tau, 0.3);
        assert!((a - b).abs() < 1e-14);
    }

    proptest! {
        #[test]
        fn prop_step_is_exact_closed_form(
            a in -5.0f64..-0.01,
            b in -5.0f64..5.0,
            x0 in -5.0f64..5.0,
            dt in 0.001f64..5.0,
        ) {
            let closed = -b / a + (x0 + b / a) * (a * dt).exp();
            let step = exact_exponential_step(x0, a, b, dt);
            let scale = 1.0 + closed.abs() + (b / a).abs();
            prop_assert!((step - closed).abs() <= 1e-12 * scale);
        }

        #[test]
        fn prop_two_half_steps_equal_one_full_step(
            a in -5.0f64..-0.01,
            b in -5.0f64..5.0,
            x0 in -5.0f64..5.0,
            dt in 0.001f64..5.0,
        ) {
            let channel = LinearChannel::new(a, b);
            let full = channel.step(x0, dt);
            let halves = channel.step(channel.step(x0, dt / 2.0), dt / 2.0);
            let scale = 1.0 + full.abs() + (b / a).abs();
            prop_assert!((full - halves).abs() <= 1e-11 * scale);
        }

        #[test]
        fn prop_step_converges_to_rk4(
            a in -3.0f64..-0.05,
            b in -2.0f64..2.0,
            x0 in -2.0f64..2.0,
            dt in 0.01f64..1.0,
        ) {
            let channel = LinearChannel::new(a, b);
            let exact = channel.step(x0, dt);
            let numeric = rk4(&channel, x0, dt, 2_000);
            prop_assert!((exact - numeric).abs() <= 1e-9 * (1.0 + exact.abs() + (b / a).abs()));
        }
    }
}
