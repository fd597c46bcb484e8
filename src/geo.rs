// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Country lookup for submitted posts.
//!
//! Lookups never fail: addresses that cannot be resolved become `Unknown`,
//! local and private addresses become `Local`.

use crate::config::GeoConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::net::IpAddr;
use tracing::debug;

pub const LOCAL: &str = "Local";
pub const UNKNOWN: &str = "Unknown";

/// Resolves a client address to a country name.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn country_for(&self, ip: &str) -> String;
}

/// Classify an address without any network traffic.
///
/// Returns `None` when the address is public and needs a remote lookup.
pub fn classify(ip: &str) -> Option<&'static str> {
    let ip = ip.trim();
    if ip.is_empty() {
        return Some(LOCAL);
    }

    match ip.parse::<IpAddr>() {
        Err(_) => Some(UNKNOWN),
        Ok(addr) if is_local(&addr) => Some(LOCAL),
        Ok(_) => None,
    }
}

fn is_local(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        // fc00::/7 unique local
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

/// Reply from an ip-api.com compatible service.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    country: String,
}

/// Looks countries up against an ip-api.com compatible endpoint.
#[derive(Debug, Clone)]
pub struct IpApiLocator {
    client: reqwest::Client,
    endpoint: String,
}

impl IpApiLocator {
    /// Build a locator whose client enforces the configured timeout.
    pub fn new(config: &GeoConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_client(client, &config.endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    async fn query(&self, ip: &str) -> Result<String, String> {
        let url = format!(
            "{}/{}?fields=status,country,countryCode",
            self.endpoint, ip
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if response.status() != StatusCode::OK {
            return Err(format!("unexpected status {}", response.status()));
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| format!("undecodable reply: {e}"))?;

        if body.status != "success" || body.country.is_empty() {
            return Err(format!("lookup status {:?}", body.status));
        }
        Ok(body.country)
    }
}

#[async_trait]
impl GeoLookup for IpApiLocator {
    async fn country_for(&self, ip: &str) -> String {
        if let Some(fixed) = classify(ip) {
            debug!(ip, country = fixed, "Address resolved locally");
            return fixed.to_string();
        }

        match self.query(ip.trim()).await {
            Ok(country) => country,
            Err(reason) => {
                debug!(ip, %reason, "Geolocation lookup failed");
                UNKNOWN.to_string()
            }
        }
    }
}

/// Answers every lookup with the same country.
#[derive(Debug, Clone)]
pub struct StaticLocator {
    country: String,
}

impl StaticLocator {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
        }
    }
}

#[async_trait]
impl GeoLookup for StaticLocator {
    async fn country_for(&self, _ip: &str) -> String {
        self.country.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_local_addresses() {
        for ip in ["", "127.0.0.1", "::1", "10.1.2.3", "192.168.0.9", "172.16.4.4", "fd12::1"] {
            assert_eq!(classify(ip), Some(LOCAL), "{ip} should be local");
        }
    }

    #[test]
    fn test_classify_unparseable() {
        assert_eq!(classify("not-an-ip"), Some(UNKNOWN));
        assert_eq!(classify("10.0.0.1:8080"), Some(UNKNOWN));
    }

    #[test]
    fn test_classify_public_needs_lookup() {
        assert_eq!(classify("8.8.8.8"), None);
        assert_eq!(classify("2001:4860:4860::8888"), None);
    }

    #[tokio::test]
    async fn test_static_locator() {
        let locator = StaticLocator::new("Iceland");
        assert_eq!(locator.country_for("8.8.8.8").await, "Iceland");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unknown() {
        let locator = IpApiLocator::new(&GeoConfig {
            enabled: true,
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
        })
        .unwrap();
        assert_eq!(locator.country_for("8.8.8.8").await, UNKNOWN);
        assert_eq!(locator.country_for("192.168.1.1").await, LOCAL);
    }
}
