//! Client for the pass-through asset proxy.
//!
//! The proxy contract is `GET <endpoint>?url=<percent-encoded target>`: on
//! success the body is the raw bytes of the target resource with its original
//! content-type; on failure, a non-2xx status. Any non-success response is a
//! recoverable per-image failure, never a fatal export failure.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::ExporterConfig;

/// Raw bytes fetched for one asset, with the upstream content-type when the
/// proxy forwarded one. The content-type is advisory; decoding is the arbiter.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct ProxyClient {
    client: reqwest::Client,
    endpoint: Option<Url>,
    origin_host: Option<String>,
}

impl ProxyClient {
    pub fn new(config: &ExporterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Proxy(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = match &config.proxy_endpoint {
            Some(raw) => Some(Url::parse(raw).map_err(|e| {
                Error::Proxy(format!("Invalid proxy endpoint {}: {}", raw, e))
            })?),
            None => None,
        };

        Ok(Self {
            client,
            endpoint,
            origin_host: config.origin_host.clone(),
        })
    }

    /// Same-origin images rasterize without the proxy rewrite.
    fn is_same_origin(&self, target: &Url) -> bool {
        match (&self.origin_host, target.host_str()) {
            (Some(origin), Some(host)) => origin == host,
            _ => false,
        }
    }

    /// Resolve the URL actually requested for `target`: cross-origin targets
    /// go through the proxy endpoint when one is configured.
    pub fn request_url(&self, target: &str) -> Result<Url> {
        let parsed = Url::parse(target).map_err(|e| Error::AssetFetch {
            url: target.to_string(),
            reason: format!("invalid URL: {}", e),
        })?;

        match &self.endpoint {
            Some(endpoint) if !self.is_same_origin(&parsed) => {
                let mut url = endpoint.clone();
                url.query_pairs_mut().append_pair("url", target);
                Ok(url)
            }
            _ => Ok(parsed),
        }
    }

    /// Fetch raw bytes for `target`.
    pub async fn fetch(&self, target: &str) -> Result<FetchedAsset> {
        let url = self.request_url(target)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::AssetFetch {
                url: target.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AssetFetch {
                url: target.to_string(),
                reason: format!("upstream returned {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| Error::AssetFetch {
            url: target.to_string(),
            reason: e.to_string(),
        })?;

        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(endpoint: Option<&str>, origin: Option<&str>) -> ProxyClient {
        let config = ExporterConfig {
            proxy_endpoint: endpoint.map(|s| s.to_string()),
            origin_host: origin.map(|s| s.to_string()),
            ..Default::default()
        };
        ProxyClient::new(&config).expect("Failed to build proxy client")
    }

    #[test]
    fn cross_origin_goes_through_proxy() {
        let client = client_with(Some("https://api.example.com/proxy"), Some("example.com"));
        let url = client
            .request_url("https://maps.googleapis.example/photo?ref=a b")
            .unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
        // The target must be percent-encoded into the query
        assert!(url.query().unwrap().contains("url="));
        assert!(url.as_str().contains("ref%3Da"));
    }

    #[test]
    fn same_origin_bypasses_proxy() {
        let client = client_with(Some("https://api.example.com/proxy"), Some("example.com"));
        let url = client.request_url("https://example.com/logo.png").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/logo.png");
    }

    #[test]
    fn no_endpoint_fetches_directly() {
        let client = client_with(None, None);
        let url = client.request_url("http://127.0.0.1:9/img.png").unwrap();
        assert_eq!(url.port(), Some(9));
    }

    #[test]
    fn invalid_target_is_per_image_failure() {
        let client = client_with(None, None);
        let err = client.request_url("not a url").unwrap_err();
        assert!(matches!(err, Error::AssetFetch { .. }));
    }
}
