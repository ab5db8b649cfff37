// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Core primitives: byte views, base32/Luhn encoding, device identity, the
//! self-signed certificate layer, and URI parsing.

/// RFC 4648 base32 (no padding), used for `DeviceId` rendering.
pub mod base32;
/// Cheap-clone owned/borrowed byte buffers used across the codec.
pub mod bytes;
/// Self-signed P-384 certificate generation, PEM persistence, SHA-256.
pub mod crypto;
/// Syncthing-compatible device identity derived from a certificate.
pub mod device_id;
/// Luhn mod-32 check digit, used by `device_id`.
pub mod luhn32;
/// URI parsing with Syncthing's default-port inference.
pub mod uri;
