//! Error types for the Nugget domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Nugget operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Document store errors ---
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

impl Error {
    /// Whether this error is the classified rate-limit failure raised after
    /// the retry budget was spent, wherever it surfaced in the call chain.
    pub fn is_rate_limit_exhausted(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_rate_limit_exhausted(),
            Self::Tool(ToolError::Upstream { source, .. }) => source.is_rate_limit_exhausted(),
            _ => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Rate limit persisted after {attempts} attempts: {message}")]
    RateLimitExhausted { attempts: u32, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    pub fn is_rate_limit_exhausted(&self) -> bool {
        matches!(self, Self::RateLimitExhausted { .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ingestion failed: {0}")]
    IngestFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool {tool_name} failed upstream: {source}")]
    Upstream {
        tool_name: String,
        #[source]
        source: ProviderError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn exhausted_rate_limit_detected_through_tool_errors() {
        let err = Error::Tool(ToolError::Upstream {
            tool_name: "restaurant_rag".into(),
            source: ProviderError::RateLimitExhausted {
                attempts: 5,
                message: "429".into(),
            },
        });
        assert!(err.is_rate_limit_exhausted());
    }

    #[test]
    fn plain_rate_limit_is_not_exhausted() {
        let err = Error::Provider(ProviderError::RateLimited { retry_after_secs: 5 });
        assert!(!err.is_rate_limit_exhausted());

        let err = Error::Provider(ProviderError::AuthenticationFailed("bad key".into()));
        assert!(!err.is_rate_limit_exhausted());
    }
}
