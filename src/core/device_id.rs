// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Device identity: `sha256(cert DER)` rendered as a checksummed,
//! dash-grouped 63-character string.

use crate::core::{base32, crypto, luhn32};
use crate::error::{Result, SyncError};

const SHA256_B32_SIZE: usize = 52;
const CHECK_DIGIT_INT: usize = 13;
const LUHN_ITERATIONS: usize = SHA256_B32_SIZE / CHECK_DIGIT_INT;
const LUHNIZED_SIZE: usize = SHA256_B32_SIZE + LUHN_ITERATIONS;
const DASH_INT: usize = 7;
const DASH_ITERATIONS: usize = LUHNIZED_SIZE / DASH_INT;
const DASHED_SIZE: usize = LUHNIZED_SIZE + DASH_ITERATIONS - 1;

/// A Syncthing-compatible device identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId {
    sha256: [u8; 32],
    display: String,
}

/// The all-zero device id, used to mark "this node" in a cluster config.
pub const LOCAL_DEVICE_ID: DeviceIdBytes = DeviceIdBytes([0u8; 32]);

/// Newtype so `LOCAL_DEVICE_ID` can be a `const` (DeviceId itself owns a
/// heap-allocated display string and can't be).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceIdBytes(pub [u8; 32]);

impl DeviceIdBytes {
    /// Materialize into a full `DeviceId`.
    pub fn to_device_id(self) -> DeviceId {
        DeviceId::from_sha256(self.0)
    }
}

impl DeviceId {
    /// Derive from a certificate's DER bytes.
    pub fn from_cert(cert_der: &crypto::CertData) -> Self {
        let sha = crypto::sha256_digest(cert_der.as_bytes());
        Self::from_sha256(sha)
    }

    /// Derive from a precomputed SHA-256 digest. Never fails: any 32-byte
    /// input has a valid dashed representation.
    pub fn from_sha256(sha256: [u8; 32]) -> Self {
        let encoded = base32::encode(&sha256);
        debug_assert_eq!(encoded.len(), SHA256_B32_SIZE);

        let mut luhnized = String::with_capacity(LUHNIZED_SIZE);
        for chunk in encoded.as_bytes().chunks(CHECK_DIGIT_INT) {
            let piece = std::str::from_utf8(chunk).expect("base32 output is ascii");
            luhnized.push_str(piece);
            luhnized.push(luhn32::calculate(piece) as char);
        }
        debug_assert_eq!(luhnized.len(), LUHNIZED_SIZE);

        let mut display = String::with_capacity(DASHED_SIZE);
        for (i, chunk) in luhnized.as_bytes().chunks(DASH_INT).enumerate() {
            if i > 0 {
                display.push('-');
            }
            display.push_str(std::str::from_utf8(chunk).expect("ascii"));
        }
        debug_assert_eq!(display.len(), DASHED_SIZE);

        Self { sha256, display }
    }

    /// Parse the dashed display form back into a `DeviceId`, validating
    /// length, dash placement, and every Luhn check digit.
    pub fn from_string(s: &str) -> Result<Self> {
        if s.len() != DASHED_SIZE {
            return Err(SyncError::InvalidDeviceId);
        }
        let bytes = s.as_bytes();
        for i in 0..DASH_ITERATIONS - 1 {
            let dash_pos = (i + 1) * DASH_INT + i;
            if bytes.get(dash_pos) != Some(&b'-') {
                return Err(SyncError::InvalidDeviceId);
            }
        }

        let stripped: String = s.chars().filter(|&c| c != '-').collect();
        if stripped.len() != LUHNIZED_SIZE {
            return Err(SyncError::InvalidDeviceId);
        }

        let mut payload = String::with_capacity(SHA256_B32_SIZE);
        for block in stripped.as_bytes().chunks(CHECK_DIGIT_INT + 1) {
            if block.len() != CHECK_DIGIT_INT + 1 {
                return Err(SyncError::InvalidDeviceId);
            }
            let block_str = std::str::from_utf8(block).map_err(|_| SyncError::InvalidDeviceId)?;
            if !luhn32::validate(block_str) {
                return Err(SyncError::InvalidDeviceId);
            }
            payload.push_str(&block_str[..CHECK_DIGIT_INT]);
        }

        let decoded = base32::decode(&payload).map_err(|_| SyncError::InvalidDeviceId)?;
        if decoded.len() != 32 {
            return Err(SyncError::InvalidDeviceId);
        }
        let mut sha256 = [0u8; 32];
        sha256.copy_from_slice(&decoded);
        Ok(Self::from_sha256(sha256))
    }

    /// Full 63-character dashed display form.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// First 7 characters of the display form.
    pub fn short_id(&self) -> &str {
        &self.display[..DASH_INT]
    }

    /// Raw SHA-256 digest.
    pub fn sha256(&self) -> &[u8; 32] {
        &self.sha256
    }

    /// Numeric form of the short id: the first 5 bytes of the digest as a
    /// big-endian 40-bit value, reconstructable via [`make_short`].
    pub fn short_numeric_id(&self) -> u64 {
        let b = &self.sha256[..5];
        ((b[0] as u64) << 32) | ((b[1] as u64) << 24) | ((b[2] as u64) << 16) | ((b[3] as u64) << 8) | (b[4] as u64)
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

/// Reconstruct the 7-character short id from a [`DeviceId::short_numeric_id`]
/// value.
pub fn make_short(value: u64) -> String {
    let b = [
        ((value >> 32) & 0xFF) as u8,
        ((value >> 24) & 0xFF) as u8,
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    ];
    let encoded = base32::encode(&b);
    encoded[..DASH_INT].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: &str = "KHQNO2S-5QSILRK-YX4JZZ4-7L77APM-QNVGZJT-EKU7IFI-PNEPBMY-4MXFMQD";

    #[test]
    fn from_generated_cert_has_valid_shape() {
        let kp = crypto::KeyPair::generate("test-device").unwrap();
        let id = DeviceId::from_cert(kp.cert_der());
        assert_eq!(id.display().len(), DASHED_SIZE);
        assert_eq!(id.short_id().len(), DASH_INT);
        // Re-deriving from the same cert is deterministic.
        assert_eq!(id, DeviceId::from_cert(kp.cert_der()));
    }

    #[test]
    fn round_trip_from_string() {
        let id = DeviceId::from_string(EXPECTED).unwrap();
        assert_eq!(id.display(), EXPECTED);
    }

    #[test]
    fn rejects_corrupted_check_digit() {
        let corrupted = "KHQNO2S-5QSILRE-YX4JZZ4-7L77APM-QNVGZJT-EKU7IFI-PNEPBMY-4MXFMQD";
        assert!(DeviceId::from_string(corrupted).is_err());
    }

    #[test]
    fn round_trip_from_sha256() {
        let id = DeviceId::from_string(EXPECTED).unwrap();
        let id2 = DeviceId::from_sha256(*id.sha256());
        assert_eq!(id, id2);
    }

    #[test]
    fn short_numeric_round_trip() {
        let id = DeviceId::from_string(EXPECTED).unwrap();
        let n = id.short_numeric_id();
        assert_ne!(n, 0);
        assert_eq!(make_short(n), id.short_id());
    }

    #[test]
    fn local_device_id_differs() {
        let id = DeviceId::from_string(EXPECTED).unwrap();
        assert_ne!(id, LOCAL_DEVICE_ID.to_device_id());
    }
}
