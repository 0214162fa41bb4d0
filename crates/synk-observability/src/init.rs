// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always goes to stderr so tool output on stdout stays
//! machine-readable. With the `file-logging` feature a combined log file is
//! written into a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── synk.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Keeps file writers alive; logs are flushed when it drops
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the `EnvFilter` for a default level plus per-crate debug flags
pub fn build_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string_with_default(default_level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global subscriber
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags
/// * `default_level` - Level for everything not flagged (e.g. `"info"`)
/// * `log_dir` - Base directory for run folders; requires `file-logging`
/// * `retention_runs` - Keep N most recent run folders (default: 10)
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    default_level: &str,
    log_dir: Option<PathBuf>,
    retention_runs: Option<usize>,
) -> Result<LoggingGuard> {
    let env_filter = build_filter(debug_flags, default_level)?;

    let mut layers = Vec::new();
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter)
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guards, run_folder) = match log_dir {
        Some(base) => {
            let run_folder = create_run_folder(&base)?;
            cleanup_old_runs(&base, retention_runs.unwrap_or(10))?;

            let appender = tracing_appender::rolling::daily(&run_folder, "synk.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(build_filter(debug_flags, default_level)?)
                .boxed();
            layers.push(file_layer);
            (vec![guard], Some(run_folder))
        }
        None => (Vec::new(), None),
    };

    #[cfg(not(feature = "file-logging"))]
    let run_folder: Option<PathBuf> = match log_dir {
        Some(dir) => {
            let _ = retention_runs;
            anyhow::bail!(
                "File logging to {} requested but the `file-logging` feature is disabled",
                dir.display()
            );
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir: run_folder,
    })
}

/// Console-only logging at `default_level` with flags from args and `SYNK_DEBUG`
pub fn init_logging_default(default_level: &str) -> Result<LoggingGuard> {
    init_logging(&crate::cli::parse_debug_flags(), default_level, None, None)
}

#[cfg(feature = "file-logging")]
fn create_run_folder(base: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Remove all but the `keep` newest `run_*` folders under `base`
#[cfg(feature = "file-logging")]
fn cleanup_old_runs(base: &Path, keep: usize) -> Result<()> {
    use chrono::NaiveDateTime;

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("run_"))
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y%m%d_%H%M%S").ok());
        if let Some(stamp) = stamp {
            runs.push((path, stamp));
        }
    }

    runs.sort_by_key(|(_, stamp)| *stamp);
    let excess = runs.len().saturating_sub(keep);
    for (path, _) in runs.into_iter().take(excess) {
        if let Err(e) = std::fs::remove_dir_all(&path) {
            eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            );
        }
    }
    Ok(())
}
