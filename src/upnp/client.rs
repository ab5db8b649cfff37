// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! SSDP discovery, device-description parsing, and SOAP actions against an
//! Internet Gateway Device.
//!
//! Mirrors `upnp_support.{h,cpp}`: an M-SEARCH multicast probe finds the
//! gateway's description URL; the description XML is walked for the
//! `WANConnectionDevice`/`WANIPConnection` service; SOAP envelopes drive
//! `GetExternalIPAddress`/`AddPortMapping`/`DeletePortMapping`/
//! `GetSpecificPortMappingEntry`.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::core::uri::Uri;
use crate::error::{Result, SyncError};
use crate::monitoring::Metrics;

const UPNP_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const UPNP_PORT: u16 = 1900;
const IGD_V1_ST: &str = "urn:schemas-upnp-org:device:InternetGatewayDevice:1";
const WAN_CONNECTION_DEVICE: &str = "urn:schemas-upnp-org:device:WANConnectionDevice:1";
const WAN_IP_CONNECTION_SERVICE: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

/// A parsed SSDP M-SEARCH response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// Location of the device-description document.
    pub location: Uri,
    /// The `ST` header value, always `IGD_V1_ST` once validated.
    pub search_target: String,
    /// The `USN` header value.
    pub usn: String,
}

/// Control/description URLs for the gateway's `WANIPConnection` service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgdDescription {
    /// SOAP control endpoint for port-mapping actions.
    pub control_url: String,
    /// Service description document URL.
    pub description_url: String,
}

fn build_msearch(max_wait: Duration) -> Vec<u8> {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         Host: {UPNP_ADDR}:{UPNP_PORT}\r\n\
         ST: {IGD_V1_ST}\r\n\
         Man: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         User-Agent: syncspirit-rs\r\n\r\n",
        max_wait.as_secs().max(1)
    )
    .into_bytes()
}

/// Parse a raw SSDP response datagram into a `DiscoveryResult`.
fn parse_ssdp_response(text: &str) -> Result<DiscoveryResult> {
    if !text.contains("\r\n\r\n") && !text.ends_with("\r\n") {
        return Err(SyncError::IncompleteDiscoveryReply);
    }

    let mut location = None;
    let mut search_target = None;
    let mut usn = None;
    for line in text.split("\r\n").skip(1) {
        let Some((key, value)) = line.split_once(':') else { continue };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "location" => location = Some(value),
            "st" => search_target = Some(value),
            "usn" => usn = Some(value),
            _ => {}
        }
    }

    let location = location.ok_or(SyncError::NoLocation)?;
    let search_target = search_target.ok_or(SyncError::NoSt)?;
    let usn = usn.ok_or(SyncError::NoUsn)?;

    if search_target != IGD_V1_ST {
        return Err(SyncError::IgdMismatch);
    }

    let location = Uri::parse(&location).map_err(|_| SyncError::MalformedUrl)?;
    Ok(DiscoveryResult { location, search_target, usn })
}

/// Probe the local network for an IGDv1 gateway, returning the first valid
/// response received within `max_wait`.
pub async fn discover_igd(max_wait: Duration) -> Result<DiscoveryResult> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|_| SyncError::TransportNotAvailable)?;
    socket
        .bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into())
        .map_err(|_| SyncError::TransportNotAvailable)?;
    socket.set_nonblocking(true).map_err(|_| SyncError::TransportNotAvailable)?;
    let socket: UdpSocket =
        UdpSocket::from_std(socket.into()).map_err(|_| SyncError::TransportNotAvailable)?;

    let request = build_msearch(max_wait);
    let target = SocketAddr::V4(SocketAddrV4::new(UPNP_ADDR, UPNP_PORT));
    socket.send_to(&request, target).await.map_err(|_| SyncError::TransportNotAvailable)?;

    let deadline = tokio::time::Instant::now() + max_wait;
    let mut buf = vec![0u8; 4096];
    loop {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Err(SyncError::TimedOut);
        }
        let Ok(recv) = tokio::time::timeout(deadline - now, socket.recv_from(&mut buf)).await
        else {
            return Err(SyncError::TimedOut);
        };
        let (len, _addr) = recv.map_err(|_| SyncError::TransportNotAvailable)?;
        let Ok(text) = std::str::from_utf8(&buf[..len]) else { continue };
        if let Ok(result) = parse_ssdp_response(text) {
            return Ok(result);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct XmlDevice {
    #[serde(rename = "deviceType", default)]
    device_type: String,
    #[serde(rename = "serviceList", default)]
    service_list: Option<XmlServiceList>,
    #[serde(rename = "deviceList", default)]
    device_list: Option<XmlDeviceList>,
}

#[derive(Debug, Deserialize, Default)]
struct XmlServiceList {
    #[serde(rename = "service", default)]
    service: Vec<XmlService>,
}

#[derive(Debug, Deserialize, Default)]
struct XmlDeviceList {
    #[serde(rename = "device", default)]
    device: Vec<XmlDevice>,
}

#[derive(Debug, Deserialize)]
struct XmlService {
    #[serde(rename = "serviceType")]
    service_type: String,
    #[serde(rename = "controlURL")]
    control_url: String,
    #[serde(rename = "SCPDURL")]
    scpd_url: String,
}

#[derive(Debug, Deserialize)]
struct XmlRoot {
    device: XmlDevice,
}

fn find_wan_ip_service(device: &XmlDevice) -> Option<&XmlService> {
    if device.device_type == WAN_CONNECTION_DEVICE {
        if let Some(list) = &device.service_list {
            if let Some(service) =
                list.service.iter().find(|s| s.service_type == WAN_IP_CONNECTION_SERVICE)
            {
                return Some(service);
            }
        }
    }
    device.device_list.as_ref()?.device.iter().find_map(find_wan_ip_service)
}

/// Fetch and parse the gateway's device-description document, extracting
/// the `WANIPConnection` service's control/description URLs.
pub async fn fetch_description(client: &Client, location: &Uri) -> Result<IgdDescription> {
    let text = client
        .get(location.as_str())
        .send()
        .await
        .map_err(|_| SyncError::TransportNotAvailable)?
        .text()
        .await
        .map_err(|_| SyncError::XmlParseError)?;

    let root: XmlRoot = quick_xml::de::from_str(&text).map_err(|_| SyncError::XmlParseError)?;
    let service = find_wan_ip_service(&root.device).ok_or(SyncError::WanNotFound)?;

    Ok(IgdDescription {
        control_url: service.control_url.clone(),
        description_url: service.scpd_url.clone(),
    })
}

fn soap_envelope(action: &str, params: &[(&str, &str)]) -> String {
    let mut args = String::new();
    for (name, value) in params {
        args.push_str(&format!("<{name}>{value}</{name}>"));
    }
    format!(
        "<?xml version='1.0'?>\
         <s:Envelope xmlns:s='http://schemas.xmlsoap.org/soap/envelope/' \
         s:encodingStyle='http://schemas.xmlsoap.org/soap/encoding/'>\
         <s:Body><u:{action} xmlns:u='{WAN_IP_CONNECTION_SERVICE}'>{args}</u:{action}></s:Body></s:Envelope>"
    )
}

async fn soap_call(client: &Client, control_url: &str, action: &str, params: &[(&str, &str)]) -> Result<String> {
    let body = soap_envelope(action, params);
    let soap_action = format!("{WAN_IP_CONNECTION_SERVICE}#{action}");
    let resp = client
        .post(control_url)
        .header("Content-Type", "text/xml")
        .header("SOAPAction", format!("\"{soap_action}\""))
        .header("Connection", "close")
        .body(body)
        .send()
        .await
        .map_err(|_| SyncError::TransportNotAvailable)?;
    resp.text().await.map_err(|_| SyncError::XmlParseError)
}

fn extract_xml_text(xml: &str, tag: &str) -> Result<String> {
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_tag = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag.as_bytes() => in_tag = true,
            Ok(Event::Text(t)) if in_tag => {
                return t.unescape().map(|s| s.into_owned()).map_err(|_| SyncError::XmlParseError);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == tag.as_bytes() => in_tag = false,
            Ok(Event::Eof) => return Err(SyncError::XmlParseError),
            Err(_) => return Err(SyncError::XmlParseError),
            _ => {}
        }
        buf.clear();
    }
}

/// A bound client for a discovered gateway's control endpoint.
pub struct UpnpClient {
    http: Client,
    control_url: String,
}

impl UpnpClient {
    /// Construct a client for `description`'s control URL.
    pub fn new(http: Client, description: &IgdDescription) -> Self {
        Self { http, control_url: description.control_url.clone() }
    }

    /// `GetExternalIPAddress`: the gateway's public IPv4 address.
    pub async fn get_external_ip(&self) -> Result<String> {
        let body = soap_call(&self.http, &self.control_url, "GetExternalIPAddress", &[]).await?;
        extract_xml_text(&body, "NewExternalIPAddress")
    }

    /// `AddPortMapping`: forward `external_port` to `internal_client:internal_port`.
    pub async fn add_port_mapping(
        &self,
        external_port: u16,
        internal_port: u16,
        internal_client: &str,
        metrics: Option<&Metrics>,
    ) -> Result<()> {
        let external_port = external_port.to_string();
        let internal_port = internal_port.to_string();
        let params = [
            ("NewRemoteHost", ""),
            ("NewExternalPort", external_port.as_str()),
            ("NewProtocol", "TCP"),
            ("NewInternalPort", internal_port.as_str()),
            ("NewInternalClient", internal_client),
            ("NewEnabled", "1"),
            ("NewPortMappingDescription", "syncspirit"),
            ("NewLeaseDuration", "0"),
        ];
        let result = soap_call(&self.http, &self.control_url, "AddPortMapping", &params).await;
        match result {
            Ok(body) if body.contains("AddPortMappingResponse") => {
                if let Some(m) = metrics {
                    m.upnp_mapping_success_total.inc();
                }
                Ok(())
            }
            Ok(_) => {
                if let Some(m) = metrics {
                    m.upnp_mapping_failure_total.inc();
                }
                Err(SyncError::XmlParseError)
            }
            Err(err) => {
                if let Some(m) = metrics {
                    m.upnp_mapping_failure_total.inc();
                }
                Err(err)
            }
        }
    }

    /// `DeletePortMapping`: remove a previously installed mapping.
    pub async fn delete_port_mapping(&self, external_port: u16, metrics: Option<&Metrics>) -> Result<()> {
        let external_port = external_port.to_string();
        let params = [
            ("NewRemoteHost", ""),
            ("NewExternalPort", external_port.as_str()),
            ("NewProtocol", "TCP"),
        ];
        let result = soap_call(&self.http, &self.control_url, "DeletePortMapping", &params).await;
        match result {
            Ok(body) if body.contains("DeletePortMappingResponse") => {
                if let Some(m) = metrics {
                    m.upnp_mapping_success_total.inc();
                }
                Ok(())
            }
            Ok(_) => {
                if let Some(m) = metrics {
                    m.upnp_mapping_failure_total.inc();
                }
                Err(SyncError::XmlParseError)
            }
            Err(err) => {
                if let Some(m) = metrics {
                    m.upnp_mapping_failure_total.inc();
                }
                Err(err)
            }
        }
    }

    /// `GetSpecificPortMappingEntry`: validate that a mapping still exists.
    pub async fn get_specific_port_mapping_entry(&self, external_port: u16) -> Result<String> {
        let external_port = external_port.to_string();
        let params = [("NewRemoteHost", ""), ("NewExternalPort", external_port.as_str()), ("NewProtocol", "TCP")];
        let body = soap_call(&self.http, &self.control_url, "GetSpecificPortMappingEntry", &params).await?;
        extract_xml_text(&body, "NewInternalClient")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
         Location: http://192.168.1.1:5000/rootDesc.xml\r\n\
         ST: urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\
         USN: uuid:1234::urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\r\n";

    #[test]
    fn parses_valid_ssdp_response() {
        let result = parse_ssdp_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(result.location.as_str(), "http://192.168.1.1:5000/rootDesc.xml");
        assert_eq!(result.search_target, IGD_V1_ST);
    }

    #[test]
    fn rejects_mismatched_search_target() {
        let bad = SAMPLE_RESPONSE.replace(IGD_V1_ST, "urn:schemas-upnp-org:device:Other:1");
        assert!(matches!(parse_ssdp_response(&bad), Err(SyncError::IgdMismatch)));
    }

    #[test]
    fn rejects_missing_location() {
        let bad = "HTTP/1.1 200 OK\r\nST: x\r\nUSN: y\r\n\r\n";
        assert!(matches!(parse_ssdp_response(bad), Err(SyncError::NoLocation)));
    }

    #[test]
    fn description_xml_finds_wan_ip_service() {
        let xml = r#"<?xml version="1.0"?>
<root>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <deviceList>
          <device>
            <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
            <serviceList>
              <service>
                <serviceType>urn:schemas-upnp-org:service:WANIPConnection:1</serviceType>
                <controlURL>/ctl/WANIPConn</controlURL>
                <SCPDURL>/WANIPConn.xml</SCPDURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
    </deviceList>
  </device>
</root>"#;
        let root: XmlRoot = quick_xml::de::from_str(xml).unwrap();
        let service = find_wan_ip_service(&root.device).unwrap();
        assert_eq!(service.control_url, "/ctl/WANIPConn");
        assert_eq!(service.scpd_url, "/WANIPConn.xml");
    }

    #[test]
    fn extracts_external_ip_from_soap_response() {
        let xml = "<s:Envelope><s:Body><u:GetExternalIPAddressResponse>\
                   <NewExternalIPAddress>203.0.113.7</NewExternalIPAddress>\
                   </u:GetExternalIPAddressResponse></s:Body></s:Envelope>";
        assert_eq!(extract_xml_text(xml, "NewExternalIPAddress").unwrap(), "203.0.113.7");
    }

    #[test]
    fn malformed_xml_reports_parse_error() {
        assert!(matches!(extract_xml_text("not xml", "Foo"), Err(SyncError::XmlParseError)));
    }
}
