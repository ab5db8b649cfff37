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

//! A Syncthing-compatible peer-to-peer file-synchronization wire stack and
//! identity layer.
//!
//! This crate provides:
//! - The sync protocol's frame codec: `Hello`, `ClusterConfig`, `Index`,
//!   requests/responses, and optional LZ4 block compression.
//! - A self-issued device identity: a self-signed P-384 certificate whose
//!   SHA-256 digest becomes a checksummed, dash-grouped display string.
//! - LAN multicast announce and HTTPS-based global rendezvous for peer
//!   discovery.
//! - A UPnP IGD client for automatic port mapping.
//! - Configuration, structured logging, and Prometheus metrics for
//!   binaries built on top of the library.

/// Core primitives: byte views, base32/Luhn encoding, device identity, and
/// the self-signed certificate layer.
pub mod core;
/// Deserialized configuration sections (C12).
pub mod config;
/// Peer discovery: LAN multicast announce and HTTPS global rendezvous.
pub mod discovery;
/// Closed error taxonomy shared by every public operation.
pub mod error;
/// Process-wide logging bootstrap (C13).
pub mod logging;
/// Observability: Prometheus metrics (C14).
pub mod monitoring;
/// The sync protocol (BEP): message definitions and the frame codec.
pub mod proto;
/// UPnP Internet Gateway Device client (C9).
pub mod upnp;

pub use error::{Result, SyncError};
