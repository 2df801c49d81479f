use adinsights_client::{Resolver, UpstreamClient};
use adinsights_core::{AdInsightsConfig, IdentityConfig, UpstreamFetch};
use adinsights_report::ReportBuilder;
use std::sync::Arc;

/// Shared, read-only request state. Each request builds its own report
/// structures on top of it.
#[derive(Clone)]
pub struct AppState {
    pub reports: ReportBuilder,
    pub identity: Arc<IdentityConfig>,
}

impl AppState {
    pub fn new(config: &AdInsightsConfig) -> adinsights_core::Result<Self> {
        let client = UpstreamClient::new(&config.upstream)?;
        Ok(Self::with_upstream(
            Arc::new(client),
            config.identity.clone(),
        ))
    }

    /// State over any upstream implementation.
    pub fn with_upstream(upstream: Arc<dyn UpstreamFetch>, identity: IdentityConfig) -> Self {
        Self {
            reports: ReportBuilder::new(Resolver::new(upstream)),
            identity: Arc::new(identity),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        self.reports.resolver()
    }
}
