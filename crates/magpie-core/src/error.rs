use thiserror::Error;

/// Pipeline-wide error types for Magpie.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Upstream answered with a non-success status.
    #[error("HTTP {code} from {url}")]
    Status { code: u16, url: String },

    /// Request could not be built or sent.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Upstream signalled a rate limit (HTTP 429).
    #[error("Rate limited by upstream")]
    RateLimited,

    /// Network/connection error.
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream payload could not be parsed (JSON, RSS, HTML).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source configuration is invalid or unreadable.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run was cancelled before this source finished.
    #[error("Cancelled")]
    Cancelled,

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl ScrapeError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// Server-side trouble (5xx, 429, timeouts, broken connections) is
    /// transient; client-side trouble (4xx, unparseable payloads, bad
    /// configuration) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Network(_) | ScrapeError::Timeout(_) | ScrapeError::RateLimited => true,
            ScrapeError::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ScrapeError::Network("reset".into()).is_transient());
        assert!(ScrapeError::Timeout(30).is_transient());
        assert!(ScrapeError::RateLimited.is_transient());
        assert!(
            ScrapeError::Status {
                code: 503,
                url: "https://example.com".into(),
            }
            .is_transient()
        );
        assert!(
            ScrapeError::Status {
                code: 429,
                url: "https://example.com".into(),
            }
            .is_transient()
        );
    }

    #[test]
    fn test_permanent_errors() {
        assert!(
            !ScrapeError::Status {
                code: 404,
                url: "https://example.com".into(),
            }
            .is_transient()
        );
        assert!(!ScrapeError::Parse("bad rss".into()).is_transient());
        assert!(!ScrapeError::Config("missing file".into()).is_transient());
        assert!(!ScrapeError::Cancelled.is_transient());
    }
}
