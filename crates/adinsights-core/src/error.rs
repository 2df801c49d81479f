use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdInsightsError {
    /// Upstream answered with a non-2xx status.
    #[error("HTTP error occurred: {status}: {message}")]
    UpstreamHttp { status: u16, message: String },

    /// Network, TLS or body decoding failure while talking to upstream.
    #[error("Other error occurred: {0}")]
    UpstreamTransport(String),

    /// Upstream answered, but not with the shape we expect.
    #[error("{0}")]
    Structural(String),

    #[error("invalid platform")]
    Validation {
        requested: String,
        available: Vec<String>,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AdInsightsError>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AdInsightsError {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    /// Prefix the error with a message describing what was being fetched.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any `Context` wrappers.
    pub fn root(&self) -> &AdInsightsError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdInsightsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message_and_keeps_root() {
        let err = AdInsightsError::UpstreamHttp {
            status: 502,
            message: "bad gateway".into(),
        }
        .context("Error retrieving insights for account 7");

        assert_eq!(
            err.to_string(),
            "Error retrieving insights for account 7: HTTP error occurred: 502: bad gateway"
        );
        assert!(matches!(
            err.root(),
            AdInsightsError::UpstreamHttp { status: 502, .. }
        ));
    }

    #[test]
    fn validation_is_detected_through_context() {
        let err = AdInsightsError::Validation {
            requested: "tiktok".into(),
            available: vec!["meta".into()],
        }
        .context("outer");
        assert!(matches!(
            err.root(),
            AdInsightsError::Validation { requested, .. } if requested == "tiktok"
        ));
    }
}
