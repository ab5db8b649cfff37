// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! UPnP Internet Gateway Device client: SSDP discovery, device-description
//! fetch, and SOAP port-mapping actions (C9).

/// SSDP discovery, XML description parsing, and SOAP action plumbing.
pub mod client;

pub use client::{
    discover_igd, fetch_description, DiscoveryResult, IgdDescription, UpnpClient,
};
