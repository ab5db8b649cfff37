// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! LAN multicast announce: a magic-prefixed `Announce` protobuf message
//! broadcast on UDP port 21027, and the responder task that answers it.
//!
//! Mirrors `bep_support.{h,cpp}`'s `make_announce_message`/`parse_announce`:
//! the packet shares the sync protocol's magic number, unlike a `Hello`
//! frame it carries no header-length prefix at all, just the magic followed
//! directly by the encoded `Announce` body.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use prost::Message as _;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::core::bytes::BytesView;
use crate::core::device_id::DeviceIdBytes;
use crate::core::uri::Uri;
use crate::error::{Result, SyncError};
use crate::monitoring::Metrics;
use crate::proto::bep;
use crate::proto::codec::MAGIC;

/// Default UDP port local announce packets are broadcast on and listened for.
pub const DEFAULT_PORT: u16 = 21027;
/// Default interval between re-broadcasts.
pub const DEFAULT_FREQUENCY: Duration = Duration::from_millis(30_000);

const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// A decoded local-announce packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announce {
    /// Announcing device's identity.
    pub id: DeviceIdBytes,
    /// Addresses the device claims to be reachable at.
    pub addresses: Vec<String>,
    /// Opaque per-run instance identifier, used to detect a peer restart.
    pub instance_id: i64,
}

/// Build a local-announce packet: `[4B magic][Announce body]`.
pub fn make_announce(device_sha: [u8; 32], uris: &[Uri], instance_id: i64) -> Vec<u8> {
    let msg = bep::Announce {
        id: device_sha.to_vec(),
        addresses: uris.iter().map(|u| u.as_str().to_string()).collect(),
        instance_id,
    };
    let body = msg.encode_to_vec();
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Parse a local-announce packet, verifying the magic prefix first.
///
/// The original has an inverted condition here (it returns an error when
/// protobuf decoding *succeeds*); this implements the corrected, natural
/// sense: success on valid protobuf, error on failure.
pub fn parse_announce(view: BytesView<'_>) -> Result<Announce> {
    let data = view.as_slice();
    if data.len() <= 4 {
        return Err(SyncError::WrongMagic { found: 0 });
    }
    let found = u32::from_be_bytes(data[0..4].try_into().unwrap());
    if found != MAGIC {
        return Err(SyncError::WrongMagic { found });
    }
    let msg = bep::Announce::decode(&data[4..]).map_err(|_| SyncError::ProtobufErr)?;
    let mut id = [0u8; 32];
    if msg.id.len() == 32 {
        id.copy_from_slice(&msg.id);
    }
    Ok(Announce { id: DeviceIdBytes(id), addresses: msg.addresses, instance_id: msg.instance_id })
}

/// Bind a multicast socket joined to the local-announce group on `port`,
/// suitable for both sending and receiving.
fn bind_multicast(port: u16) -> Result<UdpSocket> {
    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(|_| SyncError::TransportNotAvailable)?;
    socket.set_reuse_address(true).map_err(|_| SyncError::TransportNotAvailable)?;
    socket
        .bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())
        .map_err(|_| SyncError::TransportNotAvailable)?;
    socket
        .join_multicast_v4(&MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)
        .map_err(|_| SyncError::TransportNotAvailable)?;
    socket.set_nonblocking(true).map_err(|_| SyncError::TransportNotAvailable)?;
    socket.set_multicast_loop_v4(true).map_err(|_| SyncError::TransportNotAvailable)?;
    UdpSocket::from_std(socket.into()).map_err(|_| SyncError::TransportNotAvailable)
}

/// Broadcast one announce packet to the local-announce multicast group.
pub async fn broadcast_once(
    socket: &UdpSocket,
    port: u16,
    device_sha: [u8; 32],
    uris: &[Uri],
    instance_id: i64,
    metrics: Option<&Metrics>,
) -> Result<()> {
    let packet = make_announce(device_sha, uris, instance_id);
    let target = SocketAddr::V4(SocketAddrV4::new(MULTICAST_ADDR, port));
    match socket.send_to(&packet, target).await {
        Ok(_) => {
            if let Some(m) = metrics {
                m.announce_success_total.inc();
            }
            Ok(())
        }
        Err(_) => {
            if let Some(m) = metrics {
                m.announce_failure_total.inc();
            }
            Err(SyncError::TransportNotAvailable)
        }
    }
}

/// Spawn a task that re-broadcasts this device's announce packet at
/// `frequency` until `shutdown` fires, and a second task that listens for
/// and decodes peers' announce packets, invoking `on_peer` for each one
/// that parses successfully.
///
/// Publishing twice with the same `(device_id, addresses, instance_id)` is
/// idempotent: peers simply see the same `Announce` again.
pub fn spawn_local_discovery(
    port: u16,
    frequency: Duration,
    device_sha: [u8; 32],
    uris: Vec<Uri>,
    instance_id: i64,
    metrics: Option<Metrics>,
    mut shutdown: watch::Receiver<bool>,
    on_peer: impl Fn(Announce, SocketAddr) + Send + Sync + 'static,
) -> Result<tokio::task::JoinHandle<()>> {
    let socket = bind_multicast(port)?;
    let socket = std::sync::Arc::new(socket);
    let send_socket = socket.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(frequency);
        let mut buf = vec![0u8; 2048];
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = broadcast_once(&send_socket, port, device_sha, &uris, instance_id, metrics.as_ref()).await {
                        tracing::warn!(?err, "local-announce broadcast failed");
                    }
                }
                recv = socket.recv_from(&mut buf) => {
                    match recv {
                        Ok((len, addr)) => {
                            match parse_announce(BytesView::new(&buf[..len])) {
                                Ok(announce) => on_peer(announce, addr),
                                Err(err) => {
                                    tracing::debug!(?err, %addr, "ignoring malformed local-announce packet");
                                    if let Some(m) = &metrics {
                                        m.frame_parse_errors_total.inc();
                                    }
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!(?err, "local-announce socket read failed");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let id = [7u8; 32];
        let uris = vec![Uri::parse("tcp://192.168.100.6:22000").unwrap()];
        let packet = make_announce(id, &uris, 1234);
        let announce = parse_announce(BytesView::new(&packet)).unwrap();
        assert_eq!(announce.id.0, id);
        assert_eq!(announce.addresses, vec!["tcp://192.168.100.6:22000".to_string()]);
        assert_eq!(announce.instance_id, 1234);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut packet = make_announce([1u8; 32], &[], 1);
        packet[0] ^= 0xFF;
        assert!(matches!(
            parse_announce(BytesView::new(&packet)),
            Err(SyncError::WrongMagic { .. })
        ));
    }

    #[test]
    fn rejects_truncated_packet() {
        assert!(matches!(
            parse_announce(BytesView::new(&[0u8; 4])),
            Err(SyncError::WrongMagic { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(id in proptest::array::uniform32(0u8..=255), instance in proptest::num::i64::ANY, addr_count in 0usize..5) {
            let uris: Vec<Uri> = (0..addr_count)
                .map(|i| Uri::parse(&format!("tcp://10.0.0.{}:22000", i + 1)).unwrap())
                .collect();
            let packet = make_announce(id, &uris, instance);
            let announce = parse_announce(BytesView::new(&packet)).unwrap();
            proptest::prop_assert_eq!(announce.id.0, id);
            proptest::prop_assert_eq!(announce.instance_id, instance);
            let expected: Vec<String> = uris.iter().map(|u| u.as_str().to_string()).collect();
            proptest::prop_assert_eq!(announce.addresses, expected);
        }
    }
}
