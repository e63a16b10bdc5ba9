//! HTTP fetch primitive used by the asynchronous RPC methods.
//!
//! The [`Fetcher`] trait is the seam: the daemon runs [`HttpFetcher`] over
//! reqwest, tests substitute a scripted double. A fetch never fails with an
//! `Err`; transport problems surface as a [`FetchResponse`] with status `0`
//! so callers handle every outcome on one path.

use crate::config::NetworkConfig;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tracing::debug;

/// Address family to bind outbound requests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    V4,
    V6,
}

impl IpProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpProtocol::V4 => "ipv4",
            IpProtocol::V6 => "ipv6",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ipv4" => Some(IpProtocol::V4),
            "ipv6" => Some(IpProtocol::V6),
            _ => None,
        }
    }

    fn unspecified(&self) -> IpAddr {
        match self {
            IpProtocol::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpProtocol::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

/// Options for one outbound fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub cookies: Option<String>,
    pub timeout: Duration,
    pub ip_protocol: Option<IpProtocol>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cookies: None,
            timeout: NetworkConfig::REQUEST_TIMEOUT,
            ip_protocol: None,
        }
    }

    pub fn with_cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_ip_protocol(mut self, ip_protocol: Option<IpProtocol>) -> Self {
        self.ip_protocol = ip_protocol;
        self
    }
}

/// Outcome of a fetch. `status == 0` means no HTTP response was received.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
    pub did_connect: bool,
    pub did_timeout: bool,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            did_connect: true,
            did_timeout: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Bytes::new(),
            did_connect: true,
            did_timeout: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            status: 0,
            body: Bytes::new(),
            did_connect: false,
            did_timeout: true,
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Human-readable reason for the status, used in error messages.
    pub fn status_text(&self) -> &'static str {
        if self.status == 0 {
            return if self.did_timeout {
                "Request timed out"
            } else {
                "No Response"
            };
        }
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown Error")
    }
}

/// The fetch primitive consumed by asynchronous RPC methods.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, request: FetchRequest) -> FetchResponse;
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a fetcher with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = build_client(timeout, None)?;
        Ok(Self { client })
    }
}

fn build_client(timeout: Duration, ip_protocol: Option<IpProtocol>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .user_agent(NetworkConfig::USER_AGENT);
    if let Some(protocol) = ip_protocol {
        builder = builder.local_address(protocol.unspecified());
    }
    Ok(builder.build()?)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> FetchResponse {
        let client = match request.ip_protocol {
            Some(protocol) => match build_client(request.timeout, Some(protocol)) {
                Ok(client) => client,
                Err(e) => {
                    debug!("fetch {}: {}", request.url, e);
                    return FetchResponse::unreachable();
                }
            },
            None => self.client.clone(),
        };

        let mut builder = client.get(&request.url).timeout(request.timeout);
        if let Some(cookies) = &request.cookies {
            builder = builder.header(header::COOKIE, cookies.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("fetch {} failed: {}", request.url, e);
                return if e.is_timeout() {
                    FetchResponse::timed_out()
                } else {
                    FetchResponse::unreachable()
                };
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => FetchResponse {
                status,
                body,
                did_connect: true,
                did_timeout: false,
            },
            Err(e) if e.is_timeout() => FetchResponse::timed_out(),
            Err(e) => {
                debug!("fetch {}: failed reading body: {}", request.url, e);
                FetchResponse::unreachable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(FetchResponse::status(500).status_text(), "Internal Server Error");
        assert_eq!(FetchResponse::status(404).status_text(), "Not Found");
        assert_eq!(FetchResponse::timed_out().status_text(), "Request timed out");
        assert_eq!(FetchResponse::unreachable().status_text(), "No Response");
    }

    #[test]
    fn test_ip_protocol_parse() {
        assert_eq!(IpProtocol::parse("IPv6"), Some(IpProtocol::V6));
        assert_eq!(IpProtocol::parse("ipv4"), Some(IpProtocol::V4));
        assert_eq!(IpProtocol::parse("ipx"), None);
    }

    #[test]
    fn test_fetcher_creation() {
        assert!(HttpFetcher::new().is_ok());
    }
}
