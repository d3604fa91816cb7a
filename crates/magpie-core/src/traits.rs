use std::future::Future;

use crate::error::ScrapeError;
use crate::record::JobPosting;

/// Body of a successful fetch, split by what the upstream declared.
///
/// Responses with an `application/json` content type arrive pre-parsed;
/// everything else (RSS, HTML, plain text) arrives verbatim.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Returns the payload as JSON, parsing text bodies on the fly.
    ///
    /// Some boards serve JSON under `text/plain`, so a text body is given
    /// one chance to parse before this fails.
    pub fn into_json(self) -> Result<serde_json::Value, ScrapeError> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(body) => serde_json::from_str(&body)
                .map_err(|e| ScrapeError::Parse(format!("expected JSON body: {e}"))),
        }
    }

    /// Returns the raw text body, refusing JSON payloads.
    pub fn into_text(self) -> Result<String, ScrapeError> {
        match self {
            Payload::Text(body) => Ok(body),
            Payload::Json(_) => Err(ScrapeError::Parse(
                "expected a text body, got JSON".to_string(),
            )),
        }
    }
}

/// Abstraction over HTTP fetching so adapters can be tested without a
/// network. The production implementation lives in `magpie-client`.
pub trait Fetch: Send + Sync + Clone {
    /// Fetches the given URL, applying whatever pacing and retry policy
    /// the implementation carries.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Payload, ScrapeError>> + Send;
}

/// One configured job source.
///
/// Adapters are built by the source factory and driven by the pipeline;
/// each `scrape` call returns every posting the source currently lists,
/// already normalized.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable name used in logs and per-source counts, e.g. `greenhouse:acme`.
    fn name(&self) -> &str;

    /// Fetches and normalizes all postings from this source.
    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_payload_into_json() {
        let payload = Payload::Json(json!({"jobs": []}));
        let value = payload.into_json().unwrap();
        assert!(value["jobs"].is_array());
    }

    #[test]
    fn test_text_payload_parses_as_json_when_possible() {
        let payload = Payload::Text(r#"{"jobs": [1, 2]}"#.to_string());
        let value = payload.into_json().unwrap();
        assert_eq!(value["jobs"][1], json!(2));
    }

    #[test]
    fn test_text_payload_that_is_not_json_fails() {
        let payload = Payload::Text("<rss></rss>".to_string());
        assert!(matches!(payload.into_json(), Err(ScrapeError::Parse(_))));
    }

    #[test]
    fn test_json_payload_into_text_fails() {
        let payload = Payload::Json(json!({}));
        assert!(matches!(payload.into_text(), Err(ScrapeError::Parse(_))));
    }
}
