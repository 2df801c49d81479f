use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Raw access to the upstream reporting API.
///
/// `endpoint` is the path plus an already encoded query string, e.g.
/// `/accounts?platform=meta`.
#[async_trait]
pub trait UpstreamFetch: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<Value>;
}
