// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime-gated tracing of individual event transitions.
//!
//! - SYNK_TRACE_EVENTS=1
//!   Optional filter:
//! - SYNK_TRACE_INSTANCE=<u32 instance id>

use std::sync::OnceLock;

use synk_kernel_mechanism::{EventRecord, Transition};
use tracing::trace;

struct EventTraceCfg {
    enabled: bool,
    instance_filter: Option<u32>,
}

fn event_trace_cfg() -> &'static EventTraceCfg {
    static CFG: OnceLock<EventTraceCfg> = OnceLock::new();
    CFG.get_or_init(|| {
        let enabled = std::env::var("SYNK_TRACE_EVENTS")
            .ok()
            .as_deref()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let instance_filter = std::env::var("SYNK_TRACE_INSTANCE")
            .ok()
            .and_then(|v| v.parse().ok());

        EventTraceCfg {
            enabled,
            instance_filter,
        }
    })
}

#[inline]
pub(crate) fn trace_transition(event: &EventRecord, transition: Transition) {
    let cfg = event_trace_cfg();
    if !cfg.enabled {
        return;
    }
    if let Some(filter) = cfg.instance_filter {
        if filter != event.instance.0 {
            return;
        }
    }
    trace!(
        target: "synk-kernel-engine",
        "[EVENT] {} t={} flag={} weight={} -> {:?}",
        event.instance,
        event.time,
        event.flag,
        event.weight,
        transition
    );
}
