// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Process-wide logging bootstrap.
//!
//! Library code never calls this; it only emits `tracing::{trace,debug,
//! info,warn,error}!` events. A binary built on top of this crate calls
//! [`init_logging`] once, before constructing anything, matching the
//! single-subscriber-installed-at-startup idiom.

/// Install a global `tracing` subscriber reading its filter from
/// `RUST_LOG` (defaulting to `info`).
///
/// `json = true` emits newline-delimited JSON, suitable for a log
/// collector; `json = false` emits compact, human-readable lines.
pub fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let result = if json {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).json().try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
