// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Deserialized configuration sections for every tunable this crate
//! exposes. The crate never reads a file itself; a caller loads the TOML
//! text and hands it to [`Config::from_toml_str`].

use serde::Deserialize;

use crate::error::{Result, SyncError};

fn default_local_discovery_port() -> u16 {
    21027
}

fn default_local_discovery_frequency_ms() -> u64 {
    30_000
}

fn default_reannounce_s() -> u64 {
    600
}

fn default_upnp_max_wait_s() -> u8 {
    1
}

fn default_upnp_external_port() -> u16 {
    22001
}

fn default_bep_connect_timeout_ms() -> u64 {
    5_000
}

fn default_bep_request_timeout_ms() -> u64 {
    60_000
}

fn default_bep_tx_timeout_ms() -> u64 {
    90_000
}

fn default_bep_rx_timeout_ms() -> u64 {
    300_000
}

/// Top-level configuration: one section per subsystem.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity and display settings.
    pub main: MainConfig,
    /// LAN multicast announce (C7).
    pub local_discovery: LocalDiscoveryConfig,
    /// HTTPS global rendezvous (C8).
    pub global_discovery: GlobalDiscoveryConfig,
    /// UPnP IGD port mapping (C9).
    pub upnp: UpnpConfig,
    /// Sync protocol timeouts (C6).
    pub bep: BepConfig,
    /// Outbound connection retry policy.
    pub dialer: DialerConfig,
    /// Filesystem scanning. Unused by this crate; retained so a full
    /// config document still parses.
    pub fs: FsConfig,
    /// Local database. Unused by this crate.
    pub db: DbConfig,
    /// Relay-assisted connectivity. Unused by this crate.
    pub relay: RelayConfig,
    /// Logging sinks. Unused by this crate: see [`crate::logging`].
    #[serde(default)]
    pub log: Vec<LogSinkConfig>,
}

impl Config {
    /// Parse a complete configuration document from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|_| SyncError::ConfigParseFailure)
    }
}

/// `[main]`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    /// Human-readable name advertised in `Hello` frames.
    pub device_name: String,
}

/// `[local_discovery]`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LocalDiscoveryConfig {
    /// Whether to run the local-announce responder/broadcaster.
    pub enabled: bool,
    /// UDP port to broadcast on and listen for peers on.
    #[serde(default = "default_local_discovery_port")]
    pub port: u16,
    /// Milliseconds between re-broadcasts.
    #[serde(default = "default_local_discovery_frequency_ms")]
    pub frequency_ms: u64,
}

impl Default for LocalDiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_local_discovery_port(),
            frequency_ms: default_local_discovery_frequency_ms(),
        }
    }
}

/// `[global_discovery]`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GlobalDiscoveryConfig {
    /// Whether to use the HTTPS rendezvous server.
    pub enabled: bool,
    /// Base URL of the rendezvous server.
    pub announce_url: String,
    /// Seconds between re-announces, absent a server-provided interval.
    #[serde(default = "default_reannounce_s")]
    pub reannounce_s: u64,
    /// Response buffer size hint.
    pub rx_buff_size: usize,
}

impl Default for GlobalDiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            announce_url: String::new(),
            reannounce_s: default_reannounce_s(),
            rx_buff_size: 0,
        }
    }
}

/// `[upnp]`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UpnpConfig {
    /// Whether to attempt automatic port mapping.
    pub enabled: bool,
    /// Seconds to wait for SSDP responses.
    #[serde(default = "default_upnp_max_wait_s")]
    pub max_wait_s: u8,
    /// External port to request a mapping for.
    #[serde(default = "default_upnp_external_port")]
    pub external_port: u16,
}

impl Default for UpnpConfig {
    fn default() -> Self {
        Self { enabled: false, max_wait_s: default_upnp_max_wait_s(), external_port: default_upnp_external_port() }
    }
}

/// `[bep]`: sync protocol connection timeouts.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BepConfig {
    /// Milliseconds allowed for the TLS handshake and initial `Hello`.
    #[serde(default = "default_bep_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Milliseconds allowed for a single request/response round-trip.
    #[serde(default = "default_bep_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Milliseconds of outbound inactivity before a keepalive `Ping`.
    #[serde(default = "default_bep_tx_timeout_ms")]
    pub tx_timeout_ms: u64,
    /// Milliseconds of inbound inactivity before the connection is torn down.
    #[serde(default = "default_bep_rx_timeout_ms")]
    pub rx_timeout_ms: u64,
}

impl Default for BepConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_bep_connect_timeout_ms(),
            request_timeout_ms: default_bep_request_timeout_ms(),
            tx_timeout_ms: default_bep_tx_timeout_ms(),
            rx_timeout_ms: default_bep_rx_timeout_ms(),
        }
    }
}

/// `[dialer]`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DialerConfig {
    /// Whether to actively redial known peers.
    pub enabled: bool,
    /// Seconds between redial attempts.
    pub redial_s: u64,
}

/// `[fs]`. Unused by this crate; retained for parse-compatibility.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Timeout for a "temporarily unavailable" file, in seconds.
    pub temporally_timeout_s: u64,
}

/// `[db]`. Unused by this crate; retained for parse-compatibility.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DbConfig {}

/// `[relay]`. Unused by this crate; retained for parse-compatibility.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {}

/// One `[[log]]` entry. Unused by this crate: see [`crate::logging`].
#[derive(Clone, Debug, Deserialize)]
pub struct LogSinkConfig {
    /// Sink name, e.g. `"stdout"`.
    pub sink: String,
    /// Minimum level passed to that sink.
    pub level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_parses_with_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.local_discovery.port, 21027);
        assert_eq!(cfg.local_discovery.frequency_ms, 30_000);
        assert_eq!(cfg.global_discovery.reannounce_s, 600);
        assert_eq!(cfg.upnp.max_wait_s, 1);
        assert_eq!(cfg.upnp.external_port, 22001);
        assert_eq!(cfg.bep.connect_timeout_ms, 5_000);
        assert_eq!(cfg.bep.request_timeout_ms, 60_000);
        assert_eq!(cfg.bep.tx_timeout_ms, 90_000);
        assert_eq!(cfg.bep.rx_timeout_ms, 300_000);
    }

    #[test]
    fn full_document_round_trips() {
        let toml = r#"
            [main]
            device_name = "laptop"

            [local_discovery]
            enabled = true
            port = 21027
            frequency_ms = 30000

            [global_discovery]
            enabled = true
            announce_url = "https://discovery.example.com"
            reannounce_s = 600
            rx_buff_size = 4096

            [upnp]
            enabled = true

            [bep]
            connect_timeout_ms = 5000

            [dialer]
            enabled = true
            redial_s = 60

            [fs]
            temporally_timeout_s = 120

            [[log]]
            sink = "stdout"
            level = "info"
        "#;
        let cfg = Config::from_toml_str(toml).unwrap();
        assert_eq!(cfg.main.device_name, "laptop");
        assert!(cfg.local_discovery.enabled);
        assert_eq!(cfg.global_discovery.announce_url, "https://discovery.example.com");
        assert_eq!(cfg.log.len(), 1);
        assert_eq!(cfg.log[0].sink, "stdout");
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(Config::from_toml_str("not = [valid"), Err(SyncError::ConfigParseFailure)));
    }
}
