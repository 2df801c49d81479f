use adinsights_core::{AdInsightsError, Result, UpstreamConfig, UpstreamFetch};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Authenticated GET client for the upstream reporting API
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder().build().map_err(|e| {
            AdInsightsError::UpstreamTransport(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl UpstreamFetch for UpstreamClient {
    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        let url = self.url_for(endpoint);
        debug!(url = %url, "upstream request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "upstream request failed");
                AdInsightsError::UpstreamTransport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                body = %body,
                "upstream returned error status"
            );
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body
            };
            return Err(AdInsightsError::UpstreamHttp {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            warn!(url = %url, error = %e, "failed to decode upstream response");
            AdInsightsError::UpstreamTransport(format!("Failed to parse response: {}", e))
        })?;
        debug!(url = %url, status = status.as_u16(), "upstream response");
        trace!(url = %url, body = %body, "upstream response body");

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let config = UpstreamConfig {
            base_url: "http://localhost:9000/api/".into(),
            token: SecretString::from("t"),
        };
        let client = UpstreamClient::new(&config).unwrap();
        assert_eq!(
            client.url_for("/fields?platform=meta"),
            "http://localhost:9000/api/fields?platform=meta"
        );
    }
}
