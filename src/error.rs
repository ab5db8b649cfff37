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

#![allow(missing_docs)]

//! Closed error taxonomy shared by every public operation in this crate.
//!
//! Categories follow the original `error_code_t`/`bep_error_code_t`/
//! `protocol_error_code_t`/`request_error_code_t` split: generic transport
//! errors, TLS/crypto errors, encoding errors, discovery/HTTP errors, UPnP
//! errors, frame-codec errors, and protocol/request errors.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Every failure mode a public operation in this crate can return.
#[derive(Debug, Error)]
pub enum SyncError {
    // -- Generic --
    #[error("cannot determine config directory")]
    CantDetermineConfigDir,
    #[error("transport not available")]
    TransportNotAvailable,
    #[error("operation timed out")]
    TimedOut,
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("already connected")]
    AlreadyConnected,
    #[error("connection impossible")]
    ConnectionImpossible,
    #[error("peer has been removed")]
    PeerHasBeenRemoved,
    #[error("configuration document could not be parsed")]
    ConfigParseFailure,

    // -- TLS / crypto --
    #[error("tls context init failed")]
    TlsContextInitFailure,
    #[error("tls parameter init failed")]
    TlsParamInitFailure,
    #[error("tls parameter generation failed")]
    TlsParamGenFailure,
    #[error("tls key generation init failed")]
    TlsKeyGenInitFailure,
    #[error("tls key generation failed")]
    TlsKeyGenFailure,
    #[error("tls ec curve selection failed")]
    TlsEcCurveFailure,
    #[error("tls ec group failed")]
    TlsEcGroupFailure,
    #[error("tls cert field set failed")]
    TlsCertSetFailure,
    #[error("tls cert extension failed")]
    TlsCertExtFailure,
    #[error("tls cert sign failed")]
    TlsCertSignFailure,
    #[error("tls cert save failed")]
    TlsCertSaveFailure,
    #[error("tls cert load failed")]
    TlsCertLoadFailure,
    #[error("tls key save failed")]
    TlsKeySaveFailure,
    #[error("tls key load failed")]
    TlsKeyLoadFailure,
    #[error("tls sha256 init failed")]
    TlsSha256InitFailure,
    #[error("tls sha256 failed")]
    TlsSha256Failure,
    #[error("tls certificate has no common name")]
    TlsCnMissing,

    // -- Encoding --
    #[error("base32 decoding failed")]
    Base32DecodingFailure,
    #[error("invalid device id")]
    InvalidDeviceId,

    // -- Discovery / HTTP+JSON --
    #[error("unexpected response code {status}")]
    UnexpectedResponseCode { status: u16 },
    #[error("negative reannounce interval")]
    NegativeReannounceInterval,
    #[error("malformed json")]
    MalformedJson,
    #[error("incorrect json shape")]
    IncorrectJson,
    #[error("malformed url")]
    MalformedUrl,
    #[error("malformed date")]
    MalformedDate,

    // -- UPnP --
    #[error("incomplete discovery reply")]
    IncompleteDiscoveryReply,
    #[error("no location header")]
    NoLocation,
    #[error("no search target header")]
    NoSt,
    #[error("no usn header")]
    NoUsn,
    #[error("igd device type mismatch")]
    IgdMismatch,
    #[error("xml parse error")]
    XmlParseError,
    #[error("wan connection service not found")]
    WanNotFound,

    // -- Frame codec --
    #[error("protobuf decode error")]
    ProtobufErr,
    #[error("unexpected message type {tag}")]
    UnexpectedMessage { tag: u8 },
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("lz4 decoding failed")]
    Lz4Decoding,
    #[error("wrong magic number {found:#x}")]
    WrongMagic { found: u32 },

    // -- Protocol --
    #[error("unknown folder {0}")]
    UnknownFolder(String),
    #[error("digest mismatch")]
    DigestMismatch,

    // -- Request --
    #[error("no such file")]
    NoSuchFile,
    #[error("invalid file")]
    InvalidFile,
    #[error("generic request error")]
    Generic,
}
