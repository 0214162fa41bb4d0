// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core traits for mechanism models
//!
//! A mechanism is stateless code operating on one instance row at a time.
//! Every phase receives the globals snapshot explicitly; nothing reads a
//! process-wide parameter block.

use core::fmt::Debug;

use bytemuck::Pod;

use crate::types::{InstanceId, MechanismError, Result};

/// What kind of object the mechanism attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MechanismKind {
    /// Attached at a single point, contributions scaled by the node area
    PointProcess,
    /// Distributed over a membrane section
    Density,
    /// Point process with no membrane contribution
    ArtificialCell,
}

impl core::fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MechanismKind::PointProcess => write!(f, "point_process"),
            MechanismKind::Density => write!(f, "density"),
            MechanismKind::ArtificialCell => write!(f, "artificial_cell"),
        }
    }
}

/// Meaning of one index-typed (pdata) slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DparamSemantic {
    /// Index into node data holding the area value
    Area,
    /// Index of the owning point process
    PointProcess,
    /// Handle into the self-event queue
    NetSend,
}

impl DparamSemantic {
    pub fn as_str(&self) -> &'static str {
        match self {
            DparamSemantic::Area => "area",
            DparamSemantic::PointProcess => "pntproc",
            DparamSemantic::NetSend => "netsend",
        }
    }
}

/// A state variable and the slot holding its derivative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSlot {
    pub name: &'static str,
    pub state: usize,
    pub derivative: usize,
}

/// A self-event requested by `net_receive`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfSend {
    pub time: f64,
    pub flag: f64,
}

/// Which branch of the event state machine an event took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// External activation on an idle channel
    Activated,
    /// External activation on a channel that was already on
    Retriggered,
    /// Self-event matching the current counter
    Deactivated,
    /// Superseded self-event, no state change
    Stale,
}

/// Result of applying one event to an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetReceiveAction {
    pub transition: Transition,
    pub schedule: Option<SelfSend>,
}

impl NetReceiveAction {
    pub fn without_schedule(transition: Transition) -> Self {
        Self {
            transition,
            schedule: None,
        }
    }
}

/// Parameter set for a mechanism, validated before globals are derived
pub trait ModelParameters: Clone + Debug + Default + Send + Sync {
    /// Reject parameters for which the closed-form update is undefined
    fn validate(&self) -> Result<()>;
}

/// A mechanism kernel
///
/// Rows are `PSIZE` scalars (AoS), index slots are `PPSIZE` entries and
/// weight blocks are `WEIGHT_WIDTH` scalars. All methods are associated
/// functions so that backends can call them from any execution context.
pub trait Mechanism: Send + Sync + 'static {
    type Parameters: ModelParameters;
    type Globals: Pod + Debug + Send + Sync;

    const NAME: &'static str;
    const KIND: MechanismKind;
    const PSIZE: usize;
    const PPSIZE: usize;
    const WEIGHT_WIDTH: usize;
    /// Slot holding the last applied delivery time
    const TSAV_SLOT: usize;
    /// Slots written when cell-state recording is on
    const RECORDED_VOLTAGE_SLOT: usize;
    const RECORDED_CONDUCTANCE_SLOT: usize;

    fn dparam_semantics() -> &'static [DparamSemantic];

    fn state_slots() -> &'static [StateSlot];

    /// Compute the global block from canonical values
    fn derive_globals(params: &Self::Parameters, celsius: f64, dt: f64) -> Result<Self::Globals>;

    fn init_instance(globals: &Self::Globals, row: &mut [f64]);

    /// Advance ODE state by `dt`
    fn advance_instance(globals: &Self::Globals, row: &mut [f64], dt: f64);

    /// Current at voltage `v`; also stores the derived output slots
    fn current(globals: &Self::Globals, row: &mut [f64], v: f64) -> f64;

    fn ode_spec(globals: &Self::Globals, row: &mut [f64]);

    fn ode_matsol(globals: &Self::Globals, row: &mut [f64], dt: f64);

    fn net_receive(
        globals: &Self::Globals,
        instance: InstanceId,
        row: &mut [f64],
        weight: &mut [f64],
        t: f64,
        flag: f64,
    ) -> Result<NetReceiveAction>;
}

/// Enforce per-instance monotonic delivery and record `t` as last applied
#[inline]
pub fn advance_delivery_clock(instance: InstanceId, tsav: &mut f64, t: f64) -> Result<()> {
    if *tsav > t {
        return Err(MechanismError::OutOfOrderDelivery {
            instance,
            last: *tsav,
            requested: t,
        });
    }
    *tsav = t;
    Ok(())
}
