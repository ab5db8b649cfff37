// Copyright (c) 2026
// Licensed under the Apache License, Version 2.0

//! URI parsing with Syncthing's default-port inference.

use crate::error::{Result, SyncError};
use url::Url;

/// A parsed URI with http/https default ports filled in when absent.
///
/// Mirrors `uri_t`: a thin wrapper around a standard URL parser whose
/// constructor sets port 80 for a portless `http://` URI and 443 for a
/// portless `https://` URI, leaving every other scheme's port untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uri {
    inner: Url,
    port: Option<u16>,
}

impl Uri {
    /// Parse `s`, applying default-port inference.
    ///
    /// Rejects anything the underlying RFC 3986 parser rejects. Unlike the
    /// WHATWG URL parser `url` otherwise implements, raw non-ASCII bytes are
    /// rejected outright rather than silently percent-encoded, matching
    /// RFC 3986's stricter grammar (a caller must escape such characters
    /// itself).
    pub fn parse(s: &str) -> Result<Self> {
        if !s.is_ascii() {
            return Err(SyncError::MalformedUrl);
        }
        let inner = Url::parse(s).map_err(|_| SyncError::MalformedUrl)?;
        let port = match inner.port() {
            Some(p) => Some(p),
            None => match inner.scheme() {
                "http" => Some(80),
                "https" => Some(443),
                _ => None,
            },
        };
        Ok(Self { inner, port })
    }

    /// URI scheme, e.g. `"tcp"`.
    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    /// Host, if present.
    pub fn host(&self) -> Option<&str> {
        self.inner.host_str()
    }

    /// Port: explicit, or inferred for http/https, or `None`.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Path component.
    pub fn path(&self) -> &str {
        self.inner.path()
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.inner.query()
    }

    /// Fragment, without the leading `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.inner.fragment()
    }

    /// Re-serialize to a string.
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse without erroring: `None` on any failure.
pub fn try_parse(s: &str) -> Option<Uri> {
    Uri::parse(s).ok()
}

/// True if `s` parses as a URI.
pub fn is_parsable(s: &str) -> bool {
    Url::parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_default_port() {
        let u = Uri::parse("http://example.com/path").unwrap();
        assert_eq!(u.port(), Some(80));
    }

    #[test]
    fn https_default_port() {
        let u = Uri::parse("https://example.com").unwrap();
        assert_eq!(u.port(), Some(443));
    }

    #[test]
    fn explicit_port_kept() {
        let u = Uri::parse("tcp://192.168.0.1:22000").unwrap();
        assert_eq!(u.port(), Some(22000));
    }

    #[test]
    fn igd_control_url() {
        let u = Uri::parse("http://192.168.1.1:49652/control").unwrap();
        assert_eq!(u.port(), Some(49652));
        assert_eq!(u.host(), Some("192.168.1.1"));
        assert_eq!(u.scheme(), "http");
        assert_eq!(u.path(), "/control");
    }

    #[test]
    fn unescaped_non_ascii_rejected() {
        assert!(Uri::parse("relay://example.com/\u{1F43E}").is_err());
    }

    #[test]
    fn ascii_equivalent_parses() {
        assert!(Uri::parse("relay://example.com/paw").is_ok());
    }
}
