use crate::error::{FeedError, Result};
use std::fmt;
use std::str::FromStr;
use tokio_tungstenite::tungstenite::http::Uri;

/// A validated `ws://` or `wss://` connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    host: String,
    secure: bool,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| FeedError::InvalidEndpoint {
            endpoint: url.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty URL"));
        }

        let uri: Uri = trimmed.parse().map_err(|e| invalid(&format!("{}", e)))?;

        let secure = match uri.scheme_str() {
            Some("ws") => false,
            Some("wss") => true,
            Some(other) => return Err(invalid(&format!("unsupported scheme '{}'", other))),
            None => return Err(invalid("missing scheme, expected ws:// or wss://")),
        };

        let host = match uri.host() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(invalid("missing host")),
        };

        Ok(Self {
            url: trimmed.to_string(),
            host,
            secure,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl FromStr for Endpoint {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_accepts_ws_and_wss() {
        let plain = Endpoint::parse("ws://127.0.0.1:8080").unwrap();
        assert!(!plain.is_secure());
        assert_eq!(plain.host(), "127.0.0.1");

        let secure: Endpoint = "wss://example/feed".parse().unwrap();
        assert!(secure.is_secure());
        assert_eq!(secure.host(), "example");
        assert_eq!(secure.to_string(), "wss://example/feed");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "   ", "example.com/feed", "http://example.com", "wss://", "not a url"] {
            let err = Endpoint::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidEndpoint, "input {:?}", bad);
        }
    }
}
