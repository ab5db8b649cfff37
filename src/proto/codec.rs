// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! The sync protocol frame codec: framing, optional LZ4 compression, and a
//! streaming parser that never buffers partial frames itself.
//!
//! Mirrors `bep_support.{h,cpp}`: a 4-byte magic distinguishes the `Hello`
//! frame from every other frame, which instead starts with a 2-byte header
//! length. The parser is a pure `view -> (message?, consumed)` function; the
//! connection layer (out of scope here) owns the accumulation buffer.

use prost::Message as _;

use crate::core::bytes::BytesView;
use crate::error::{Result, SyncError};
use crate::monitoring::Metrics;
use crate::proto::bep;

/// The 4-byte big-endian value that opens a `Hello` frame in place of a
/// header length.
pub const MAGIC: u32 = 0x2EA7D9_0B;

/// Per-frame compression choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// Body carries the serialized message bytes directly.
    None,
    /// Body is `[4B BE uncompressed-length][LZ4 block]`.
    Lz4,
}

/// One outbound/inbound sync-protocol message, tagged by variant.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Hello(bep::Hello),
    ClusterConfig(bep::ClusterConfig),
    Index(bep::Index),
    IndexUpdate(bep::IndexUpdate),
    Request(bep::Request),
    Response(bep::Response),
    DownloadProgress(bep::DownloadProgress),
    Ping(bep::Ping),
    Close(bep::Close),
}

impl Frame {
    /// The wire `MessageType` tag for this variant. `Hello` never appears in
    /// a header (it's distinguished by the magic instead) but still has a
    /// reserved tag value, matching the original's `get_bep_type<Hello>()`.
    fn type_tag(&self) -> u8 {
        match self {
            Frame::ClusterConfig(_) => 0,
            Frame::Index(_) => 1,
            Frame::IndexUpdate(_) => 2,
            Frame::Request(_) => 3,
            Frame::Response(_) => 4,
            Frame::DownloadProgress(_) => 5,
            Frame::Ping(_) => 6,
            Frame::Close(_) => 7,
            Frame::Hello(_) => 100,
        }
    }

    fn encode_body(&self) -> Vec<u8> {
        match self {
            Frame::Hello(m) => m.encode_to_vec(),
            Frame::ClusterConfig(m) => m.encode_to_vec(),
            Frame::Index(m) => m.encode_to_vec(),
            Frame::IndexUpdate(m) => m.encode_to_vec(),
            Frame::Request(m) => m.encode_to_vec(),
            Frame::Response(m) => m.encode_to_vec(),
            Frame::DownloadProgress(m) => m.encode_to_vec(),
            Frame::Ping(m) => m.encode_to_vec(),
            Frame::Close(m) => m.encode_to_vec(),
        }
    }
}

/// Result of a single `parse_bep` call.
///
/// `consumed == 0` means the input was incomplete: the caller must append
/// more bytes and re-parse from the same offset, never treating this as an
/// error.
#[derive(Clone, Debug, PartialEq)]
pub struct WrappedMessage {
    /// The decoded frame. Meaningless when `consumed == 0`.
    pub message: Option<Frame>,
    /// Bytes consumed from the front of the input view.
    pub consumed: usize,
}

impl WrappedMessage {
    fn incomplete() -> Self {
        Self { message: None, consumed: 0 }
    }
}

fn decode_by_tag(tag: u8, body: &[u8]) -> Result<Frame> {
    match tag {
        0 => Ok(Frame::ClusterConfig(bep::ClusterConfig::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        1 => Ok(Frame::Index(bep::Index::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        2 => Ok(Frame::IndexUpdate(bep::IndexUpdate::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        3 => Ok(Frame::Request(bep::Request::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        4 => Ok(Frame::Response(bep::Response::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        5 => Ok(Frame::DownloadProgress(
            bep::DownloadProgress::decode(body).map_err(|_| SyncError::ProtobufErr)?,
        )),
        6 => Ok(Frame::Ping(bep::Ping::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        7 => Ok(Frame::Close(bep::Close::decode(body).map_err(|_| SyncError::ProtobufErr)?)),
        other => Err(SyncError::UnexpectedMessage { tag: other }),
    }
}

/// Build a `Hello` frame: `[4B magic][2B BE header-length][Hello body]`.
pub fn make_hello(device_name: &str) -> Vec<u8> {
    let hello = bep::Hello {
        device_name: device_name.to_string(),
        client_name: "syncspirit-rs".to_string(),
        client_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let body = hello.encode_to_vec();
    let mut out = Vec::with_capacity(6 + body.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Serialize any non-`Hello` frame, optionally LZ4-compressing the body.
///
/// Writes the *body*'s length into the 4-byte body-length field (the
/// original has a bug here that writes the header's length instead; per
/// spec this is corrected).
pub fn serialize(frame: &Frame, compression: Compression) -> Vec<u8> {
    let msg_bytes = frame.encode_body();

    let header = bep::Header {
        r#type: frame.type_tag() as i32,
        compression: match compression {
            Compression::None => bep::MessageCompression::None as i32,
            Compression::Lz4 => bep::MessageCompression::Lz4 as i32,
        },
    };
    let header_bytes = header.encode_to_vec();

    let body: Vec<u8> = match compression {
        Compression::None => msg_bytes,
        Compression::Lz4 => {
            let compressed = lz4_flex::block::compress(&msg_bytes);
            let mut b = Vec::with_capacity(4 + compressed.len());
            b.extend_from_slice(&(msg_bytes.len() as u32).to_be_bytes());
            b.extend_from_slice(&compressed);
            b
        }
    };

    let mut out = Vec::with_capacity(2 + header_bytes.len() + 4 + body.len());
    out.extend_from_slice(&(header_bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Streaming frame parser: never buffers, never re-parses consumed bytes.
///
/// Returns `{message: None, consumed: 0}` on any incomplete prefix. A
/// malformed-but-complete frame is a hard error; the owning connection must
/// be torn down (no partial-trust parsing). Counts failures into `metrics`
/// when given: LZ4 block failures into `lz4_decode_errors_total`, every
/// other decode failure into `frame_parse_errors_total`.
pub fn parse_bep(view: BytesView<'_>, metrics: Option<&Metrics>) -> Result<WrappedMessage> {
    let result = parse_bep_inner(view);
    if let Err(err) = &result {
        if let Some(m) = metrics {
            match err {
                SyncError::Lz4Decoding => m.lz4_decode_errors_total.inc(),
                _ => m.frame_parse_errors_total.inc(),
            }
        }
    }
    result
}

fn parse_bep_inner(view: BytesView<'_>) -> Result<WrappedMessage> {
    let data = view.as_slice();
    if data.len() < 4 {
        return Ok(WrappedMessage::incomplete());
    }

    let maybe_magic = u32::from_be_bytes(data[0..4].try_into().unwrap());
    if maybe_magic == MAGIC {
        if data.len() < 6 {
            return Ok(WrappedMessage::incomplete());
        }
        let hello_len = u16::from_be_bytes(data[4..6].try_into().unwrap()) as usize;
        let total = 6 + hello_len;
        if data.len() < total {
            return Ok(WrappedMessage::incomplete());
        }
        let hello = bep::Hello::decode(&data[6..total]).map_err(|_| SyncError::ProtobufErr)?;
        return Ok(WrappedMessage { message: Some(Frame::Hello(hello)), consumed: total });
    }

    let header_len = u16::from_be_bytes(data[0..2].try_into().unwrap()) as usize;
    if 2 + header_len > data.len() {
        return Ok(WrappedMessage::incomplete());
    }
    let header =
        bep::Header::decode(&data[2..2 + header_len]).map_err(|_| SyncError::ProtobufErr)?;

    let after_header = 2 + header_len;
    if after_header + 4 > data.len() {
        return Ok(WrappedMessage::incomplete());
    }
    let body_len =
        u32::from_be_bytes(data[after_header..after_header + 4].try_into().unwrap()) as usize;
    let body_start = after_header + 4;
    let total = body_start + body_len;
    if data.len() < total {
        return Ok(WrappedMessage::incomplete());
    }
    let body = &data[body_start..total];

    let compression = if header.compression == bep::MessageCompression::Lz4 as i32 {
        Compression::Lz4
    } else {
        Compression::None
    };

    let decoded_msg = match compression {
        Compression::None => decode_by_tag(header.r#type as u8, body)?,
        Compression::Lz4 => {
            if body.len() < 4 {
                return Err(SyncError::Lz4Decoding);
            }
            let uncompressed_len =
                u32::from_be_bytes(body[0..4].try_into().unwrap()) as usize;
            let block = &body[4..];
            let plain = lz4_flex::block::decompress(block, uncompressed_len)
                .map_err(|_| SyncError::Lz4Decoding)?;
            decode_by_tag(header.r#type as u8, &plain)?
        }
    };

    Ok(WrappedMessage { message: Some(decoded_msg), consumed: total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_frame_hex_fixture() {
        let hex = "2ea7d90b001f0a096c6f63616c686f7374120973796e637468696e671a0776312e31312e31";
        let bytes = decode_hex(hex);
        let view = BytesView::new(&bytes);
        let wrapped = parse_bep(view, None).unwrap();
        assert_eq!(wrapped.consumed, 35);
        match wrapped.message.unwrap() {
            Frame::Hello(h) => {
                assert_eq!(h.device_name, "localhost");
                assert_eq!(h.client_name, "syncthing");
                assert_eq!(h.client_version, "v1.11.1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn make_hello_round_trips() {
        let bytes = make_hello("test-device");
        let wrapped = parse_bep(BytesView::new(&bytes), None).unwrap();
        assert_eq!(wrapped.consumed, bytes.len());
        match wrapped.message.unwrap() {
            Frame::Hello(h) => {
                assert_eq!(h.device_name, "test-device");
                assert_eq!(h.client_name, "syncspirit-rs");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn incomplete_prefix_reports_zero_consumed() {
        let full = make_hello("x");
        for len in 0..full.len() {
            let wrapped = parse_bep(BytesView::new(&full[..len]), None).unwrap();
            assert_eq!(wrapped.consumed, 0);
            assert!(wrapped.message.is_none());
        }
    }

    #[test]
    fn ping_round_trip_uncompressed() {
        let frame = Frame::Ping(bep::Ping {});
        let bytes = serialize(&frame, Compression::None);
        let wrapped = parse_bep(BytesView::new(&bytes), None).unwrap();
        assert_eq!(wrapped.consumed, bytes.len());
        assert!(matches!(wrapped.message.unwrap(), Frame::Ping(_)));
    }

    #[test]
    fn close_round_trip_lz4() {
        let frame = Frame::Close(bep::Close { reason: "bye".into() });
        let bytes = serialize(&frame, Compression::Lz4);
        let wrapped = parse_bep(BytesView::new(&bytes), None).unwrap();
        assert_eq!(wrapped.consumed, bytes.len());
        match wrapped.message.unwrap() {
            Frame::Close(c) => assert_eq!(c.reason, "bye"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn corrupted_lz4_body_fails() {
        let frame = Frame::Close(bep::Close { reason: "x".repeat(64) });
        let mut bytes = serialize(&frame, Compression::Lz4);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(parse_bep(BytesView::new(&bytes), None), Err(SyncError::Lz4Decoding)));
    }

    #[test]
    fn cluster_config_lz4_frame_fixture() {
        let hex = "00021001000000b5000000c2a10abf010a0464617461120600f5588201340a2045727536abf5e5b7f9e78dbdbfeb5472dd65062718c60b7504bedc1f14a401bf120768702d6e6f74651a0764796e616d69638201420a2051e0d76a5d8490b8e2fc4e73cfafff03e0da9b2999154fa0af691e16638cb95912096c6f63616c686f73743900c1300540c3e4dda2be8ab2ed3d7c00f911897f93b095153fd352e4f5fabd8cc52d7a2d2160f3766ed7c5ce275fede576127c00506e616d6963";
        let bytes = decode_hex(hex);
        let wrapped = parse_bep(BytesView::new(&bytes), None).unwrap();
        assert_eq!(wrapped.consumed, bytes.len());
        let cc = match wrapped.message.unwrap() {
            Frame::ClusterConfig(cc) => cc,
            other => panic!("unexpected frame: {other:?}"),
        };
        assert_eq!(cc.folders.len(), 1);
        let folder = &cc.folders[0];
        assert_eq!(folder.label, "data");
        assert!(!folder.read_only);
        assert_eq!(folder.devices.len(), 3);

        let ids: Vec<String> = folder
            .devices
            .iter()
            .map(|d| {
                let mut sha = [0u8; 32];
                sha.copy_from_slice(&d.id);
                crate::core::device_id::DeviceId::from_sha256(sha).display().to_string()
            })
            .collect();
        assert_eq!(ids[0], "IVZHKNV-L6XS3PS-6PHRW63-722UOLD-OWKBRHD-DDAW5IV-EX3OB6F-FEAG7QQ");
        assert_eq!(ids[1], "KHQNO2S-5QSILRK-YX4JZZ4-7L77APM-QNVGZJT-EKU7IFI-PNEPBMY-4MXFMQD");
        assert_eq!(ids[2], "RF7ZHME-VCU75G2-UXE6X5L-3DGFFVV-5C2ILA6-N3G5V6F-FZYTV73-PFOYJAR");
        assert_eq!(folder.devices[0].addresses, vec!["dynamic".to_string()]);

        // Corrupting one byte of the LZ4 body triggers Lz4Decoding.
        let mut corrupted = bytes.clone();
        corrupted[11] = 0xC0;
        assert!(matches!(parse_bep(BytesView::new(&corrupted), None), Err(SyncError::Lz4Decoding)));
    }

    #[test]
    fn unknown_message_type_rejected() {
        let header = bep::Header { r#type: 99, compression: bep::MessageCompression::None as i32 };
        let header_bytes = header.encode_to_vec();
        let mut out = Vec::new();
        out.extend_from_slice(&(header_bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            parse_bep(BytesView::new(&out), None),
            Err(SyncError::UnexpectedMessage { tag: 99 })
        ));
    }

    #[test]
    fn decode_failure_increments_frame_parse_errors() {
        let metrics = Metrics::new().unwrap();
        let header = bep::Header { r#type: 99, compression: bep::MessageCompression::None as i32 };
        let header_bytes = header.encode_to_vec();
        let mut out = Vec::new();
        out.extend_from_slice(&(header_bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&0u32.to_be_bytes());
        assert!(parse_bep(BytesView::new(&out), Some(&metrics)).is_err());
        assert_eq!(metrics.frame_parse_errors_total.get(), 1);
        assert_eq!(metrics.lz4_decode_errors_total.get(), 0);
    }

    #[test]
    fn lz4_failure_increments_lz4_decode_errors() {
        let metrics = Metrics::new().unwrap();
        let frame = Frame::Close(bep::Close { reason: "x".repeat(64) });
        let mut bytes = serialize(&frame, Compression::Lz4);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(parse_bep(BytesView::new(&bytes), Some(&metrics)).is_err());
        assert_eq!(metrics.lz4_decode_errors_total.get(), 1);
        assert_eq!(metrics.frame_parse_errors_total.get(), 0);
    }

    fn decode_hex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    proptest::proptest! {
        #[test]
        fn prop_close_round_trip(reason in ".{0,200}") {
            let frame = Frame::Close(bep::Close { reason });
            let bytes = serialize(&frame, Compression::None);
            let wrapped = parse_bep(BytesView::new(&bytes), None).unwrap();
            proptest::prop_assert_eq!(wrapped.consumed, bytes.len());
            proptest::prop_assert_eq!(wrapped.message.unwrap(), frame);
        }
    }
}
