use adinsights_core::{AdInsightsError, Result, UpstreamFetch};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

enum Canned {
    Body(Value),
    Status(u16, String),
}

/// In-memory upstream serving canned bodies per endpoint.
///
/// Endpoints with nothing registered answer 404. Every call is recorded so
/// tests can assert on fetch order.
#[derive(Default)]
pub struct StubUpstream {
    responses: HashMap<String, Canned>,
    calls: Mutex<Vec<String>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, endpoint: &str, body: Value) -> Self {
        self.responses
            .insert(endpoint.to_string(), Canned::Body(body));
        self
    }

    pub fn with_error(mut self, endpoint: &str, status: u16, message: &str) -> Self {
        self.responses.insert(
            endpoint.to_string(),
            Canned::Status(status, message.to_string()),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl UpstreamFetch for StubUpstream {
    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        self.calls.lock().push(endpoint.to_string());
        match self.responses.get(endpoint) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status, message)) => Err(AdInsightsError::UpstreamHttp {
                status: *status,
                message: message.clone(),
            }),
            None => Err(AdInsightsError::UpstreamHttp {
                status: 404,
                message: format!("no stub for {}", endpoint),
            }),
        }
    }
}
