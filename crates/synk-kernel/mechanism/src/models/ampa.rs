// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # AMPA Synapse (two-pool kinetic scheme)
//!
//! ## Model Dynamics
//!
//! ```text
//! State:
//!     dRon/dt  = (synon·Rinf - Ron) / Rtau
//!     dRoff/dt = -Beta · Roff
//!
//!     Rinf = Alpha / (Alpha + Beta)
//!     Rtau = 1 / (Alpha + Beta)
//!
//! Current:
//!     g = Ron + Roff
//!     i = g · (v - Erev)
//!
//! Events (per weight block [weight, on, nspike, r0, t0]):
//!     flag == 0        nspike += 1
//!                      if !on: r0 *= exp(-Beta·(t - t0)); t0 = t; on = 1
//!                              synon += weight; Ron += r0; Roff -= r0
//!                      send self-event at t + Cdur with flag = nspike
//!     flag == nspike   r0 = weight·Rinf + (r0 - weight·Rinf)·exp(-(t - t0)/Rtau); t0 = t
//!                      synon -= weight; Ron -= r0; Roff += r0; on = 0
//!     otherwise        stale, ignored
//! ```

use bytemuck::{Pod, Zeroable};

use super::traits::{
    advance_delivery_clock, DparamSemantic, Mechanism, MechanismKind, ModelParameters,
    NetReceiveAction, SelfSend, StateSlot, Transition,
};
use crate::integrator::{decay_amplitude, relax_toward, LinearChannel};
use crate::types::{InstanceId, MechanismError, Result, EXTERNAL_ACTIVATION_FLAG};

/// Row slot offsets (AoS, 10 scalars per instance)
pub mod slot {
    pub const I: usize = 0;
    pub const G: usize = 1;
    pub const RON: usize = 2;
    pub const ROFF: usize = 3;
    pub const SYNON: usize = 4;
    pub const DRON: usize = 5;
    pub const DROFF: usize = 6;
    pub const V_UNUSED: usize = 7;
    pub const G_UNUSED: usize = 8;
    pub const TSAV: usize = 9;
}

/// Weight block offsets (5 scalars per connection)
pub mod weight_slot {
    pub const WEIGHT: usize = 0;
    pub const ON: usize = 1;
    pub const NSPIKE: usize = 2;
    pub const R0: usize = 3;
    pub const T0: usize = 4;
}

/// `tsav` value before any delivery
pub const TSAV_UNSET: f64 = -1.0e20;

const DPARAM_SEMANTICS: [DparamSemantic; 3] = [
    DparamSemantic::Area,
    DparamSemantic::PointProcess,
    DparamSemantic::NetSend,
];

const STATE_SLOTS: [StateSlot; 2] = [
    StateSlot {
        name: "Ron",
        state: slot::RON,
        derivative: slot::DRON,
    },
    StateSlot {
        name: "Roff",
        state: slot::ROFF,
        derivative: slot::DROFF,
    },
];

/// AMPA synapse kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct AmpaModel;

/// Canonical AMPA parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmpaParameters {
    /// Forward binding rate (/ms)
    pub alpha: f64,
    /// Unbinding rate (/ms)
    pub beta: f64,
    /// Transmitter pulse duration (ms)
    pub cdur: f64,
    /// Reversal potential (mV)
    pub erev: f64,
    pub ron0: f64,
    pub roff0: f64,
}

impl Default for AmpaParameters {
    fn default() -> Self {
        Self {
            alpha: 0.94,
            beta: 0.18,
            cdur: 0.3,
            erev: 0.0,
            ron0: 0.0,
            roff0: 0.0,
        }
    }
}

impl ModelParameters for AmpaParameters {
    fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(MechanismError::DegenerateRate {
                name: "Alpha",
                value: self.alpha,
                reason: "must be finite and non-negative",
            });
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(MechanismError::DegenerateRate {
                name: "Beta",
                value: self.beta,
                reason: "must be finite and positive",
            });
        }
        if !self.cdur.is_finite() || self.cdur <= 0.0 {
            return Err(MechanismError::InvalidParameter {
                name: "Cdur",
                value: self.cdur,
                reason: "must be finite and positive",
            });
        }
        for (name, value) in [("Erev", self.erev), ("Ron0", self.ron0), ("Roff0", self.roff0)] {
            if !value.is_finite() {
                return Err(MechanismError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }
}

/// Global block shared read-only by all AMPA instances during a phase
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AmpaGlobals {
    pub alpha: f64,
    pub beta: f64,
    pub cdur: f64,
    pub erev: f64,
    pub ron0: f64,
    pub roff0: f64,
    pub rinf: f64,
    pub rtau: f64,
    pub delta_t: f64,
    pub celsius: f64,
}

impl AmpaGlobals {
    #[inline(always)]
    fn ron_channel(&self, synon: f64) -> LinearChannel {
        LinearChannel::new(-1.0 / self.rtau, synon * self.rinf / self.rtau)
    }

    #[inline(always)]
    fn roff_channel(&self) -> LinearChannel {
        LinearChannel::decay(self.beta)
    }
}

impl Mechanism for AmpaModel {
    type Parameters = AmpaParameters;
    type Globals = AmpaGlobals;

    const NAME: &'static str = "AMPA_S";
    const KIND: MechanismKind = MechanismKind::PointProcess;
    const PSIZE: usize = 10;
    const PPSIZE: usize = 3;
    const WEIGHT_WIDTH: usize = 5;
    const TSAV_SLOT: usize = slot::TSAV;
    const RECORDED_VOLTAGE_SLOT: usize = slot::V_UNUSED;
    const RECORDED_CONDUCTANCE_SLOT: usize = slot::G_UNUSED;

    fn dparam_semantics() -> &'static [DparamSemantic] {
        &DPARAM_SEMANTICS
    }

    fn state_slots() -> &'static [StateSlot] {
        &STATE_SLOTS
    }

    fn derive_globals(params: &AmpaParameters, celsius: f64, dt: f64) -> Result<AmpaGlobals> {
        params.validate()?;
        let total = params.alpha + params.beta;
        Ok(AmpaGlobals {
            alpha: params.alpha,
            beta: params.beta,
            cdur: params.cdur,
            erev: params.erev,
            ron0: params.ron0,
            roff0: params.roff0,
            rinf: params.alpha / total,
            rtau: 1.0 / total,
            delta_t: dt,
            celsius,
        })
    }

    fn init_instance(globals: &AmpaGlobals, row: &mut [f64]) {
        row[slot::ROFF] = globals.roff0;
        row[slot::RON] = globals.ron0;
        row[slot::SYNON] = 0.0;
        row[slot::TSAV] = TSAV_UNSET;
    }

    #[inline(always)]
    fn advance_instance(globals: &AmpaGlobals, row: &mut [f64], dt: f64) {
        let ron = globals.ron_channel(row[slot::SYNON]);
        row[slot::RON] = ron.step(row[slot::RON], dt);
        row[slot::ROFF] = globals.roff_channel().step(row[slot::ROFF], dt);
    }

    #[inline(always)]
    fn current(globals: &AmpaGlobals, row: &mut [f64], v: f64) -> f64 {
        let g = row[slot::RON] + row[slot::ROFF];
        let i = g * (v - globals.erev);
        row[slot::G] = g;
        row[slot::I] = i;
        i
    }

    fn ode_spec(globals: &AmpaGlobals, row: &mut [f64]) {
        row[slot::DRON] = globals
            .ron_channel(row[slot::SYNON])
            .derivative(row[slot::RON]);
        row[slot::DROFF] = globals.roff_channel().derivative(row[slot::ROFF]);
    }

    fn ode_matsol(globals: &AmpaGlobals, row: &mut [f64], dt: f64) {
        row[slot::DRON] = globals
            .ron_channel(row[slot::SYNON])
            .implicit_diagonal_solve(row[slot::DRON], dt);
        row[slot::DROFF] = globals
            .roff_channel()
            .implicit_diagonal_solve(row[slot::DROFF], dt);
    }

    fn net_receive(
        globals: &AmpaGlobals,
        instance: InstanceId,
        row: &mut [f64],
        weight: &mut [f64],
        t: f64,
        flag: f64,
    ) -> Result<NetReceiveAction> {
        advance_delivery_clock(instance, &mut row[slot::TSAV], t)?;

        if flag == EXTERNAL_ACTIVATION_FLAG {
            weight[weight_slot::NSPIKE] += 1.0;
            let transition = if weight[weight_slot::ON] == 0.0 {
                let r0 = decay_amplitude(
                    weight[weight_slot::R0],
                    globals.beta,
                    t - weight[weight_slot::T0],
                );
                weight[weight_slot::R0] = r0;
                weight[weight_slot::T0] = t;
                weight[weight_slot::ON] = 1.0;
                row[slot::SYNON] += weight[weight_slot::WEIGHT];
                row[slot::RON] += r0;
                row[slot::ROFF] -= r0;
                Transition::Activated
            } else {
                Transition::Retriggered
            };
            return Ok(NetReceiveAction {
                transition,
                schedule: Some(SelfSend {
                    time: t + globals.cdur,
                    flag: weight[weight_slot::NSPIKE],
                }),
            });
        }

        if flag == weight[weight_slot::NSPIKE] {
            let w = weight[weight_slot::WEIGHT];
            let r0 = relax_toward(
                w * globals.rinf,
                weight[weight_slot::R0],
                globals.rtau,
                t - weight[weight_slot::T0],
            );
            weight[weight_slot::R0] = r0;
            weight[weight_slot::T0] = t;
            row[slot::SYNON] -= w;
            row[slot::RON] -= r0;
            row[slot::ROFF] += r0;
            weight[weight_slot::ON] = 0.0;
            return Ok(NetReceiveAction::without_schedule(Transition::Deactivated));
        }

        Ok(NetReceiveAction::without_schedule(Transition::Stale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals() -> AmpaGlobals {
        AmpaModel::derive_globals(&AmpaParameters::default(), 34.0, 0.025).unwrap()
    }

    fn fresh_row(g: &AmpaGlobals) -> [f64; 10] {
        let mut row = [0.0; 10];
        AmpaModel::init_instance(g, &mut row);
        row
    }

    fn weight_block(w: f64) -> [f64; 5] {
        [w, 0.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn test_derived_constants() {
        let g = globals();
        assert!((g.rinf - 0.94 / 1.12).abs() < 1e-15);
        assert!((g.rtau - 1.0 / 1.12).abs() < 1e-15);
        assert_eq!(g.delta_t, 0.025);
        assert_eq!(g.celsius, 34.0);
    }

    #[test]
    fn test_init_sets_initial_state_and_clock() {
        let params = AmpaParameters {
            ron0: 0.2,
            roff0: 0.1,
            ..Default::default()
        };
        let g = AmpaModel::derive_globals(&params, 6.3, 0.025).unwrap();
        let mut row = [9.0; 10];
        AmpaModel::init_instance(&g, &mut row);
        assert_eq!(row[slot::RON], 0.2);
        assert_eq!(row[slot::ROFF], 0.1);
        assert_eq!(row[slot::SYNON], 0.0);
        assert_eq!(row[slot::TSAV], TSAV_UNSET);
    }

    #[test]
    fn test_validate_rejects_degenerate_rates() {
        let zero_beta = AmpaParameters {
            beta: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            zero_beta.validate(),
            Err(MechanismError::DegenerateRate { name: "Beta", .. })
        ));

        let nan_alpha = AmpaParameters {
            alpha: f64::NAN,
            ..Default::default()
        };
        assert!(AmpaModel::derive_globals(&nan_alpha, 6.3, 0.025).is_err());

        let bad_cdur = AmpaParameters {
            cdur: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_cdur.validate(),
            Err(MechanismError::InvalidParameter { name: "Cdur", .. })
        ));
    }

    #[test]
    fn test_current_law_and_output_slots() {
        let g = globals();
        let mut row = fresh_row(&g);
        row[slot::RON] = 0.3;
        row[slot::ROFF] = 0.2;
        let i = AmpaModel::current(&g, &mut row, -65.0);
        assert!((i - 0.5 * -65.0).abs() < 1e-12);
        assert_eq!(row[slot::G], 0.5);
        assert_eq!(row[slot::I], i);
    }

    #[test]
    fn test_counter_supersedes_earlier_activation() {
        let g = globals();
        let mut row = fresh_row(&g);
        let mut w = weight_block(1.0);
        let id = InstanceId(0);

        let first = AmpaModel::net_receive(&g, id, &mut row, &mut w, 0.0, 0.0).unwrap();
        assert_eq!(first.transition, Transition::Activated);
        assert_eq!(first.schedule, Some(SelfSend { time: 0.3, flag: 1.0 }));
        assert_eq!(row[slot::SYNON], 1.0);

        let second = AmpaModel::net_receive(&g, id, &mut row, &mut w, 0.1, 0.0).unwrap();
        assert_eq!(second.transition, Transition::Retriggered);
        let sched = second.schedule.unwrap();
        assert!((sched.time - 0.4).abs() < 1e-15);
        assert_eq!(sched.flag, 2.0);
        assert_eq!(row[slot::SYNON], 1.0);

        let stale = AmpaModel::net_receive(&g, id, &mut row, &mut w, 0.3, 1.0).unwrap();
        assert_eq!(stale.transition, Transition::Stale);
        assert_eq!(w[weight_slot::ON], 1.0);
        assert_eq!(row[slot::SYNON], 1.0);

        let off = AmpaModel::net_receive(&g, id, &mut row, &mut w, sched.time, 2.0).unwrap();
        assert_eq!(off.transition, Transition::Deactivated);
        assert_eq!(off.schedule, None);
        assert_eq!(w[weight_slot::ON], 0.0);
        assert_eq!(row[slot::SYNON], 0.0);
    }

    #[test]
    fn test_transitions_conserve_channel_mass() {
        let g = globals();
        let mut row = fresh_row(&g);
        row[slot::RON] = 0.4;
        row[slot::ROFF] = 0.6;
        let mut w = weight_block(0.7);
        w[weight_slot::R0] = 0.25;
        let id = InstanceId(3);

        let total = |r: &[f64; 10]| r[slot::RON] + r[slot::ROFF];
        let before = total(&row);
        AmpaModel::net_receive(&g, id, &mut row, &mut w, 1.0, 0.0).unwrap();
        assert!((total(&row) - before).abs() < 1e-12);
        AmpaModel::net_receive(&g, id, &mut row, &mut w, 1.3, 1.0).unwrap();
        assert!((total(&row) - before).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_order_delivery_is_fatal() {
        let g = globals();
        let mut row = fresh_row(&g);
        let mut w = weight_block(1.0);
        AmpaModel::net_receive(&g, InstanceId(1), &mut row, &mut w, 2.0, 0.0).unwrap();
        let err = AmpaModel::net_receive(&g, InstanceId(1), &mut row, &mut w, 1.0, 0.0);
        assert!(matches!(err, Err(MechanismError::OutOfOrderDelivery { .. })));
    }

    #[test]
    fn test_advance_relaxes_to_steady_state() {
        let g = globals();
        let mut row = fresh_row(&g);
        row[slot::SYNON] = 2.0;
        row[slot::ROFF] = 1.0;
        for _ in 0..10_000 {
            AmpaModel::advance_instance(&g, &mut row, 0.025);
        }
        assert!((row[slot::RON] - 2.0 * g.rinf).abs() < 1e-9);
        assert!(row[slot::ROFF].abs() < 1e-9);
    }

    #[test]
    fn test_ode_spec_and_matsol() {
        let g = globals();
        let mut row = fresh_row(&g);
        row[slot::SYNON] = 1.0;
        row[slot::RON] = 0.1;
        row[slot::ROFF] = 0.5;
        AmpaModel::ode_spec(&g, &mut row);
        let dron = (g.rinf - 0.1) / g.rtau;
        let droff = -g.beta * 0.5;
        assert!((row[slot::DRON] - dron).abs() < 1e-12);
        assert!((row[slot::DROFF] - droff).abs() < 1e-12);

        AmpaModel::ode_matsol(&g, &mut row, 0.025);
        assert!((row[slot::DRON] - dron / (1.0 + 0.025 / g.rtau)).abs() < 1e-12);
        assert!((row[slot::DROFF] - droff / (1.0 + 0.025 * g.beta)).abs() < 1e-12);
    }

    #[test]
    fn test_globals_are_plain_bytes() {
        let g = globals();
        let bytes = bytemuck::bytes_of(&g);
        assert_eq!(bytes.len(), 10 * core::mem::size_of::<f64>());
        let back: AmpaGlobals = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(back, g);
    }
}
