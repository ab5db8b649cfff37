// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! HTTPS global rendezvous client: announce this device's addresses to a
//! discovery server and look up other devices' addresses by id.
//!
//! Mirrors `discovery_support.{h,cpp}`'s `make_announce_request`/
//! `make_discovery_request`/`parse_announce`/`parse_discovery`.

use reqwest::{Client, StatusCode};
use time::OffsetDateTime;

use crate::core::device_id::DeviceId;
use crate::core::uri::Uri;
use crate::error::{Result, SyncError};
use crate::monitoring::Metrics;

/// A discovery response: the addresses a device was last seen at, and when.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// Reachable addresses, as raw URI strings that parsed successfully.
    pub addresses: Vec<Uri>,
    /// When the responding server last saw this device, if it said.
    pub seen: Option<OffsetDateTime>,
}

#[derive(serde::Serialize)]
struct AnnounceRequest<'a> {
    addresses: &'a [String],
}

/// Announce this device's addresses to the global discovery server at
/// `base_url`, returning the reannounce interval it asks for.
pub async fn announce(
    client: &Client,
    base_url: &str,
    addresses: &[Uri],
    metrics: Option<&Metrics>,
) -> Result<std::time::Duration> {
    let url = format!("{}/v2", base_url.trim_end_matches('/'));
    let body = AnnounceRequest {
        addresses: &addresses.iter().map(|u| u.as_str().to_string()).collect::<Vec<_>>(),
    };

    let result = announce_inner(client, &url, &body).await;
    match &result {
        Ok(interval) => {
            if let Some(m) = metrics {
                m.discovery_success_total.inc();
                m.active_reannounce_interval_seconds.set(interval.as_secs() as i64);
            }
        }
        Err(_) => {
            if let Some(m) = metrics {
                m.discovery_failure_total.inc();
            }
        }
    }
    result
}

async fn announce_inner(
    client: &Client,
    url: &str,
    body: &AnnounceRequest<'_>,
) -> Result<std::time::Duration> {
    let resp = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|_| SyncError::TransportNotAvailable)?;

    let status = resp.status();
    if status != StatusCode::NO_CONTENT && status != StatusCode::TOO_MANY_REQUESTS {
        return Err(SyncError::UnexpectedResponseCode { status: status.as_u16() });
    }

    let seconds = resp
        .headers()
        .get("Reannounce-After")
        .or_else(|| resp.headers().get("Retry-After"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    match seconds {
        Some(s) if s > 0 => Ok(std::time::Duration::from_secs(s as u64)),
        _ => Err(SyncError::NegativeReannounceInterval),
    }
}

/// Look up `device`'s known addresses on the global discovery server at
/// `base_url`.
pub async fn discover(
    client: &Client,
    base_url: &str,
    device: &DeviceId,
    metrics: Option<&Metrics>,
) -> Result<DiscoveryResult> {
    let url = format!("{}?device={}", base_url, device.display());
    let result = discover_inner(client, &url).await;
    match &result {
        Ok(_) => {
            if let Some(m) = metrics {
                m.discovery_success_total.inc();
            }
        }
        Err(_) => {
            if let Some(m) = metrics {
                m.discovery_failure_total.inc();
            }
        }
    }
    result
}

async fn discover_inner(client: &Client, url: &str) -> Result<DiscoveryResult> {
    let resp = client.get(url).send().await.map_err(|_| SyncError::TransportNotAvailable)?;
    let status = resp.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(DiscoveryResult { addresses: Vec::new(), seen: None });
    }
    if status != StatusCode::OK {
        return Err(SyncError::UnexpectedResponseCode { status: status.as_u16() });
    }

    let text = resp.text().await.map_err(|_| SyncError::TransportNotAvailable)?;
    parse_discovery_body(&text)
}

/// Validate and decode a discovery response body.
///
/// Mirrors `parse_contact`: a syntactically invalid document is
/// [`SyncError::MalformedJson`], a syntactically valid document with the
/// wrong shape (not an object, `addresses` not an array of strings, `seen`
/// not a string) is [`SyncError::IncorrectJson`]. Individual addresses that
/// fail to parse as a URI are skipped rather than failing the whole
/// response; only an empty resulting address list is an error.
fn parse_discovery_body(text: &str) -> Result<DiscoveryResult> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|_| SyncError::MalformedJson)?;
    let obj = value.as_object().ok_or(SyncError::IncorrectJson)?;

    let addresses_json = obj.get("addresses").and_then(|v| v.as_array()).ok_or(SyncError::IncorrectJson)?;
    let mut addresses = Vec::new();
    for item in addresses_json {
        let raw = item.as_str().ok_or(SyncError::IncorrectJson)?;
        if let Ok(uri) = Uri::parse(raw) {
            addresses.push(uri);
        }
    }
    if addresses.is_empty() {
        return Err(SyncError::MalformedUrl);
    }

    let seen_raw = obj.get("seen").and_then(|v| v.as_str()).ok_or(SyncError::IncorrectJson)?;
    let seen = Some(parse_seen(seen_raw)?);

    Ok(DiscoveryResult { addresses, seen })
}

/// Parse the `seen` field's ISO-8601 extended timestamp, silently trimming
/// any trailing characters that aren't part of a valid timestamp (a
/// fractional-second suffix the server appended, for instance).
fn parse_seen(raw: &str) -> Result<OffsetDateTime> {
    let format = time::format_description::well_known::Rfc3339;
    if let Ok(dt) = OffsetDateTime::parse(raw, &format) {
        return Ok(dt);
    }
    let trimmed = raw.trim_end_matches(|c: char| !c.is_ascii_digit() && c != 'Z' && c != '+' && c != ':' && c != '-');
    OffsetDateTime::parse(trimmed, &format).map_err(|_| SyncError::MalformedDate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seen_accepts_rfc3339() {
        let dt = parse_seen("2023-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.year(), 2023);
    }

    #[test]
    fn parse_seen_rejects_garbage() {
        assert!(matches!(parse_seen("not-a-date"), Err(SyncError::MalformedDate)));
    }

    #[test]
    fn discovery_response_shape_matches_wire() {
        let json = r#"{"addresses": ["tcp://1.2.3.4:22000"], "seen": "2023-01-15T10:30:00Z"}"#;
        let result = parse_discovery_body(json).unwrap();
        assert_eq!(result.addresses.len(), 1);
        assert_eq!(result.addresses[0].as_str(), "tcp://1.2.3.4:22000");
        assert!(result.seen.is_some());
    }

    #[test]
    fn malformed_json_is_distinguished_from_wrong_shape() {
        assert!(matches!(parse_discovery_body("not json"), Err(SyncError::MalformedJson)));
        assert!(matches!(parse_discovery_body("[]"), Err(SyncError::IncorrectJson)));
        assert!(matches!(
            parse_discovery_body(r#"{"addresses": "not-an-array", "seen": "2023-01-15T10:30:00Z"}"#),
            Err(SyncError::IncorrectJson)
        ));
        assert!(matches!(
            parse_discovery_body(r#"{"addresses": [1, 2], "seen": "2023-01-15T10:30:00Z"}"#),
            Err(SyncError::IncorrectJson)
        ));
        assert!(matches!(
            parse_discovery_body(r#"{"addresses": ["tcp://1.2.3.4:22000"], "seen": 42}"#),
            Err(SyncError::IncorrectJson)
        ));
    }

    #[test]
    fn unparseable_addresses_are_skipped_not_fatal() {
        let json = r#"{"addresses": ["not a uri", "tcp://1.2.3.4:22000"], "seen": "2023-01-15T10:30:00Z"}"#;
        let result = parse_discovery_body(json).unwrap();
        assert_eq!(result.addresses.len(), 1);
        assert_eq!(result.addresses[0].as_str(), "tcp://1.2.3.4:22000");
    }

    #[test]
    fn all_addresses_unparseable_is_malformed_url() {
        let json = r#"{"addresses": ["not a uri"], "seen": "2023-01-15T10:30:00Z"}"#;
        assert!(matches!(parse_discovery_body(json), Err(SyncError::MalformedUrl)));
    }
}
