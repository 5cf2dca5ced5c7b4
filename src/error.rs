use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("No value supplied for placeholder {{{placeholder}}}")]
    PromptSubstitution { placeholder: String },

    #[error("Cannot connect to backend at {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    #[error("Backend returned HTTP {status}: {body}")]
    BackendTransport { status: u16, body: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend returned an empty response")]
    BackendEmptyResponse,

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Response was empty after cleaning")]
    CleanedResultEmpty,

    #[error("No ranking found in reply: {0}")]
    NoRankingFound(String),

    #[error("Incomplete ranking: expected {expected} candidates, got {found}")]
    IncompleteRanking { expected: usize, found: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RewriteError {
    /// True for failures raised by the transport layer (network or HTTP status).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RewriteError::Connection { .. } | RewriteError::BackendTransport { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RewriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_error_display() {
        let err = RewriteError::PromptSubstitution {
            placeholder: "TASK".to_string(),
        };
        assert_eq!(err.to_string(), "No value supplied for placeholder {TASK}");
    }

    #[test]
    fn test_transport_display_carries_status_and_body() {
        let err = RewriteError::BackendTransport {
            status: 503,
            body: "model is loading".to_string(),
        };
        assert_eq!(err.to_string(), "Backend returned HTTP 503: model is loading");
        assert!(err.is_transport());
    }

    #[test]
    fn test_is_transport() {
        let err = RewriteError::Connection {
            endpoint: "http://localhost:11434".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.is_transport());
        assert!(!RewriteError::BackendEmptyResponse.is_transport());
        assert!(!RewriteError::EmptyInput.is_transport());
    }
}
