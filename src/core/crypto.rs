// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! Self-signed P-384 certificate generation and DER/PEM helpers.
//!
//! A device's identity (see [`crate::core::device_id`]) is derived entirely
//! from the SHA-256 digest of its TLS certificate, so certificate generation
//! lives here rather than behind a generic "TLS setup" abstraction: the
//! exact extensions and validity window below are part of the wire
//! contract, not an implementation detail.

use std::path::Path;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509NameBuilder, X509};
use zeroize::Zeroize;

use crate::error::{Result, SyncError};

/// Expiry used by every generated certificate: 2050-01-01T04:59:59Z.
const NOT_AFTER_EPOCH: i64 = 2_524_568_399;

/// DER-encoded bytes tagged with what they represent, to avoid mixing up a
/// certificate's DER with a key's DER at a call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertData(pub Vec<u8>);

impl CertData {
    /// Borrow the DER bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A generated or loaded device identity: a self-signed certificate and its
/// private key, both available as DER and reconstructable to PEM.
pub struct KeyPair {
    cert_der: CertData,
    key_der: CertData,
    pkey: PKey<Private>,
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.key_der.0.zeroize();
    }
}

impl KeyPair {
    /// Certificate DER bytes.
    pub fn cert_der(&self) -> &CertData {
        &self.cert_der
    }

    /// Private key DER bytes (PKCS#8).
    pub fn key_der(&self) -> &CertData {
        &self.key_der
    }

    /// Generate a fresh P-384 keypair and self-signed X.509 certificate.
    ///
    /// Matches the original's `generate_pair`: NIST P-384, v3 certificate,
    /// subject == issuer == `CN=<issuer_name>`, a random positive 63-bit
    /// serial, `notBefore` now, `notAfter` 2050-01-01T04:59:59Z,
    /// `BasicConstraints critical CA:false`, `KeyUsage critical
    /// DigitalSignature|KeyEncipherment`, `ExtKeyUsage
    /// serverAuth|clientAuth`, self-signed with SHA-256 (a P-384 key signed
    /// with a SHA-384 digest would not match a Syncthing-compatible peer's
    /// expectations here, so the digest is pinned independently of the
    /// curve).
    pub fn generate(issuer_name: &str) -> Result<Self> {
        let group = EcGroup::from_curve_name(Nid::SECP384R1).map_err(|_| SyncError::TlsEcGroupFailure)?;
        let ec_key = EcKey::generate(&group).map_err(|_| SyncError::TlsKeyGenFailure)?;
        let pkey = PKey::from_ec_key(ec_key).map_err(|_| SyncError::TlsKeyGenFailure)?;

        let mut name_builder = X509NameBuilder::new().map_err(|_| SyncError::TlsCertSetFailure)?;
        name_builder
            .append_entry_by_text("CN", issuer_name)
            .map_err(|_| SyncError::TlsCertSetFailure)?;
        let name = name_builder.build();

        let mut builder = X509::builder().map_err(|_| SyncError::TlsParamInitFailure)?;
        builder.set_version(2).map_err(|_| SyncError::TlsCertSetFailure)?;
        let serial_number = random_positive_serial()?;
        builder
            .set_serial_number(&serial_number)
            .map_err(|_| SyncError::TlsCertSetFailure)?;
        builder.set_subject_name(&name).map_err(|_| SyncError::TlsCertSetFailure)?;
        builder.set_issuer_name(&name).map_err(|_| SyncError::TlsCertSetFailure)?;
        builder.set_pubkey(&pkey).map_err(|_| SyncError::TlsCertSetFailure)?;

        let not_before = Asn1Time::days_from_now(0).map_err(|_| SyncError::TlsCertSetFailure)?;
        builder.set_not_before(&not_before).map_err(|_| SyncError::TlsCertSetFailure)?;
        let not_after =
            Asn1Time::from_unix(NOT_AFTER_EPOCH).map_err(|_| SyncError::TlsCertSetFailure)?;
        builder.set_not_after(&not_after).map_err(|_| SyncError::TlsCertSetFailure)?;

        let basic_constraints =
            BasicConstraints::new().critical().build().map_err(|_| SyncError::TlsCertExtFailure)?;
        let key_usage = KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build()
            .map_err(|_| SyncError::TlsCertExtFailure)?;
        let ext_key_usage = ExtendedKeyUsage::new()
            .server_auth()
            .client_auth()
            .build()
            .map_err(|_| SyncError::TlsCertExtFailure)?;
        builder.append_extension(basic_constraints).map_err(|_| SyncError::TlsCertExtFailure)?;
        builder.append_extension(key_usage).map_err(|_| SyncError::TlsCertExtFailure)?;
        builder.append_extension(ext_key_usage).map_err(|_| SyncError::TlsCertExtFailure)?;

        builder.sign(&pkey, MessageDigest::sha256()).map_err(|_| SyncError::TlsCertSignFailure)?;
        let cert = builder.build();

        let cert_der = cert.to_der().map_err(|_| SyncError::TlsCertSaveFailure)?;
        let key_der = pkey.private_key_to_pkcs8().map_err(|_| SyncError::TlsKeySaveFailure)?;

        Ok(Self { cert_der: CertData(cert_der), key_der: CertData(key_der), pkey })
    }

    /// Save certificate and private key as PEM files at the given paths.
    pub fn save(&self, cert_path: &Path, key_path: &Path) -> Result<()> {
        let cert = X509::from_der(&self.cert_der.0).map_err(|_| SyncError::TlsCertSaveFailure)?;
        let cert_pem = cert.to_pem().map_err(|_| SyncError::TlsCertSaveFailure)?;
        let key_pem = self.pkey.private_key_to_pem_pkcs8().map_err(|_| SyncError::TlsKeySaveFailure)?;

        std::fs::write(cert_path, cert_pem).map_err(|_| SyncError::TlsCertSaveFailure)?;
        std::fs::write(key_path, key_pem).map_err(|_| SyncError::TlsKeySaveFailure)?;
        Ok(())
    }

    /// Load certificate and private key from PEM files.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_pem = std::fs::read(cert_path).map_err(|_| SyncError::TlsCertLoadFailure)?;
        let key_pem = std::fs::read(key_path).map_err(|_| SyncError::TlsKeyLoadFailure)?;

        let cert = X509::from_pem(&cert_pem).map_err(|_| SyncError::TlsCertLoadFailure)?;
        let pkey = PKey::private_key_from_pem(&key_pem).map_err(|_| SyncError::TlsKeyLoadFailure)?;

        let cert_der = cert.to_der().map_err(|_| SyncError::TlsCertLoadFailure)?;
        let key_der = pkey.private_key_to_pkcs8().map_err(|_| SyncError::TlsKeyLoadFailure)?;

        Ok(Self { cert_der: CertData(cert_der), key_der: CertData(key_der), pkey })
    }
}

fn random_positive_serial() -> Result<openssl::asn1::Asn1Integer> {
    let mut data = [0u8; 8];
    openssl::rand::rand_bytes(&mut data).map_err(|_| SyncError::TlsCertSetFailure)?;
    // Clear the top bit so the value is always positive when read as a
    // signed 64-bit integer, matching `max_sn = UINT64_MAX >> 1`.
    data[0] &= 0x7F;
    let serial = BigNum::from_slice(&data).map_err(|_| SyncError::TlsCertSetFailure)?;
    serial.to_asn1_integer().map_err(|_| SyncError::TlsCertSetFailure)
}

/// SHA-256 digest of arbitrary bytes (used for hashing a certificate's DER
/// form into a device id).
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    openssl::sha::sha256(data)
}

/// Extract the `CN` (common name) from a DER-encoded X.509 certificate.
pub fn common_name(cert_der: &CertData) -> Result<String> {
    let cert = X509::from_der(&cert_der.0).map_err(|_| SyncError::TlsCnMissing)?;
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|s| s.to_string())
        .ok_or(SyncError::TlsCnMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generate_and_read_cn() {
        let kp = KeyPair::generate("test-device").unwrap();
        let cn = common_name(kp.cert_der()).unwrap();
        assert_eq!(cn, "test-device");
    }

    #[test]
    fn save_and_load_round_trip() {
        let kp = KeyPair::generate("round-trip").unwrap();
        let dir = tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        kp.save(&cert_path, &key_path).unwrap();

        let loaded = KeyPair::load(&cert_path, &key_path).unwrap();
        assert_eq!(loaded.cert_der(), kp.cert_der());
    }

    #[test]
    fn sha256_is_32_bytes() {
        let d = sha256_digest(b"hello");
        assert_eq!(d.len(), 32);
    }
}
