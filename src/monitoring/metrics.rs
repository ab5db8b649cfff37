// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Prometheus counters and gauges for the sync protocol's entry points.
//!
//! Every C6-C9 operation takes `Option<&Metrics>` so a caller that doesn't
//! care about observability can pass `None` and pay nothing for it.

use prometheus::{core::Collector, IntCounter, IntGauge, Registry};

use crate::error::{Result, SyncError};

/// Metrics registry and the counters/gauges registered into it.
#[derive(Clone)]
pub struct Metrics {
    /// Underlying prometheus registry, exposed for a caller's `/metrics`
    /// HTTP handler.
    pub registry: Registry,

    /// Frame bodies that failed to decode as protobuf, or carried an
    /// unrecognized message tag.
    pub frame_parse_errors_total: IntCounter,
    /// LZ4 block decompression failures.
    pub lz4_decode_errors_total: IntCounter,
    /// Successful local-announce broadcasts.
    pub announce_success_total: IntCounter,
    /// Failed local-announce broadcasts.
    pub announce_failure_total: IntCounter,
    /// Successful global-discovery rendezvous round-trips.
    pub discovery_success_total: IntCounter,
    /// Failed global-discovery rendezvous round-trips.
    pub discovery_failure_total: IntCounter,
    /// Successful UPnP port mapping requests.
    pub upnp_mapping_success_total: IntCounter,
    /// Failed UPnP port mapping requests.
    pub upnp_mapping_failure_total: IntCounter,
    /// Reannounce interval currently in effect, as reported by the last
    /// global-discovery response.
    pub active_reannounce_interval_seconds: IntGauge,
}

impl Metrics {
    /// Construct a fresh registry with every counter and gauge registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let frame_parse_errors_total =
            IntCounter::new("frame_parse_errors_total", "Frame bodies that failed to decode")
                .map_err(|_| SyncError::ServiceNotAvailable)?;
        let lz4_decode_errors_total = IntCounter::new(
            "lz4_decode_errors_total",
            "LZ4 block decompression failures",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let announce_success_total = IntCounter::new(
            "announce_success_total",
            "Successful local-announce broadcasts",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let announce_failure_total = IntCounter::new(
            "announce_failure_total",
            "Failed local-announce broadcasts",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let discovery_success_total = IntCounter::new(
            "discovery_success_total",
            "Successful global-discovery round-trips",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let discovery_failure_total = IntCounter::new(
            "discovery_failure_total",
            "Failed global-discovery round-trips",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let upnp_mapping_success_total = IntCounter::new(
            "upnp_mapping_success_total",
            "Successful UPnP port mapping requests",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let upnp_mapping_failure_total = IntCounter::new(
            "upnp_mapping_failure_total",
            "Failed UPnP port mapping requests",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;
        let active_reannounce_interval_seconds = IntGauge::new(
            "active_reannounce_interval_seconds",
            "Reannounce interval currently in effect",
        )
        .map_err(|_| SyncError::ServiceNotAvailable)?;

        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(frame_parse_errors_total.clone()),
            Box::new(lz4_decode_errors_total.clone()),
            Box::new(announce_success_total.clone()),
            Box::new(announce_failure_total.clone()),
            Box::new(discovery_success_total.clone()),
            Box::new(discovery_failure_total.clone()),
            Box::new(upnp_mapping_success_total.clone()),
            Box::new(upnp_mapping_failure_total.clone()),
            Box::new(active_reannounce_interval_seconds.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .map_err(|_| SyncError::ServiceNotAvailable)?;
        }

        Ok(Self {
            registry,
            frame_parse_errors_total,
            lz4_decode_errors_total,
            announce_success_total,
            announce_failure_total,
            discovery_success_total,
            discovery_failure_total,
            upnp_mapping_success_total,
            upnp_mapping_failure_total,
            active_reannounce_interval_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_every_collector() {
        let metrics = Metrics::new().unwrap();
        let families = metrics.registry.gather();
        assert_eq!(families.len(), 9);
    }

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.announce_success_total.get(), 0);
        metrics.announce_success_total.inc();
        assert_eq!(metrics.announce_success_total.get(), 1);
    }
}
