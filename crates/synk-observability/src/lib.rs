// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # synk-observability
//!
//! Logging setup shared by Synk binaries, with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: daily-rolling log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Tracing targets used across the workspace, for debug flags
pub const KNOWN_CRATES: &[&str] = &["synk", "synk-config", "synk-kernel-engine", "synk-trace"];
