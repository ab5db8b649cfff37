// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Observability: Prometheus metrics (C14).

/// Counters and gauges for the sync protocol's entry points.
pub mod metrics;

pub use metrics::Metrics;
