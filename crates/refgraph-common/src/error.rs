use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefgraphError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{source_name}: rate limited (HTTP 429)")]
    RateLimited { source_name: String },

    #[error("{source_name}: transient fault: {message}")]
    Transient { source_name: String, message: String },

    #[error("{source_name}: HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("domain not in allowlist for URL {0}")]
    BlockedDomain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RefgraphError {
    /// Rate-limit and transient faults are worth retrying; everything else
    /// is final for the request that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RefgraphError::RateLimited { .. } | RefgraphError::Transient { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RefgraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let rate = RefgraphError::RateLimited { source_name: "openalex".to_string() };
        let transient = RefgraphError::Transient {
            source_name: "openalex".to_string(),
            message: "connect timeout".to_string(),
        };
        let status = RefgraphError::Status { source_name: "openalex".to_string(), status: 404 };
        let blocked = RefgraphError::BlockedDomain("https://elsewhere.example".to_string());

        assert!(rate.is_retryable());
        assert!(transient.is_retryable());
        assert!(!status.is_retryable());
        assert!(!blocked.is_retryable());
        assert!(!RefgraphError::Config("bad".to_string()).is_retryable());
    }
}
