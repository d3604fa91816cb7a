use std::time::Duration;

use magpie_core::error::ScrapeError;
use magpie_core::traits::{Fetch, Payload};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub const DEFAULT_USER_AGENT: &str = "Magpie/0.2 (Respectful Crawler)";

/// Some boards reject anything that does not look like a desktop browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const MIN_BACKOFF_SECS: u64 = 4;
const MAX_BACKOFF_SECS: u64 = 10;

/// HTTP client for one source: polite pacing, bounded retries, content
/// negotiation.
///
/// Every request is preceded by a mandatory delay (plus a little jitter)
/// so the crawler stays slow from the upstream's point of view. Transient
/// failures are retried with exponential backoff clamped to a
/// `4s..=10s` window; a 429 instead waits three times the polite delay.
/// One client serves one source; pacing is per client, so concurrently
/// scraped sources never share a budget.
#[derive(Clone)]
pub struct FetchClient {
    client: Client,
    delay: Duration,
    jitter: Duration,
    timeout_secs: u64,
    max_attempts: u32,
}

impl FetchClient {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::builder().build()
    }

    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::default()
    }

    async fn pause_politely(&self) {
        let pause = effective_pause(self.delay, self.jitter);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Payload, ScrapeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ScrapeError::Network(format!("Connection failed: {e}"))
            } else {
                ScrapeError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ScrapeError::RateLimited);
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Http(format!("Failed to read response body: {e}")))?;

        if is_json {
            // A JSON body that does not parse is a failed fetch, never a
            // partial success.
            let value = serde_json::from_str(&body)
                .map_err(|e| ScrapeError::Parse(format!("invalid JSON from {url}: {e}")))?;
            Ok(Payload::Json(value))
        } else {
            Ok(Payload::Text(body))
        }
    }
}

impl Fetch for FetchClient {
    async fn fetch(&self, url: &str) -> Result<Payload, ScrapeError> {
        for attempt in 1..=self.max_attempts {
            self.pause_politely().await;
            match self.try_fetch(url).await {
                Ok(payload) => return Ok(payload),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let backoff = match &error {
                        ScrapeError::RateLimited => self.delay.saturating_mul(3),
                        _ => backoff_delay(attempt),
                    };
                    tracing::warn!(
                        %url,
                        %attempt,
                        %error,
                        backoff_ms = %backoff.as_millis(),
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(error) => return Err(error),
            }
        }
        Err(ScrapeError::Http(format!("no fetch attempts configured for {url}")))
    }
}

/// Builder for [`FetchClient`].
#[derive(Debug, Clone)]
pub struct FetchClientBuilder {
    delay: Duration,
    jitter: Duration,
    timeout: Duration,
    max_attempts: u32,
    user_agent: String,
    headers: Vec<(String, String)>,
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            jitter: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
        }
    }
}

impl FetchClientBuilder {
    /// Minimum pause before every request.
    pub fn rate_limit(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Random extra pause, uniform in `[0, jitter]`, on top of the rate
    /// limit.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Switches to a desktop-browser identity.
    pub fn browser_headers(mut self) -> Self {
        self.user_agent = BROWSER_USER_AGENT.to_string();
        self.headers
            .push(("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()));
        self.headers
            .push(("Connection".to_string(), "keep-alive".to_string()));
        self
    }

    pub fn build(self) -> Result<FetchClient, ScrapeError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScrapeError::Http(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ScrapeError::Http(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ScrapeError::Http(e.to_string()))?;

        Ok(FetchClient {
            client,
            delay: self.delay,
            jitter: self.jitter,
            timeout_secs: self.timeout.as_secs(),
            max_attempts: self.max_attempts,
        })
    }
}

fn effective_pause(delay: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return delay;
    }
    delay + Duration::from_millis(rand_jitter_ms(jitter.as_millis() as u64))
}

/// Backoff before retry number `attempt`: `2^attempt` seconds clamped
/// into the 4s..=10s window.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64 << attempt.min(6);
    Duration::from_secs(secs.clamp(MIN_BACKOFF_SECS, MAX_BACKOFF_SECS))
}

// Jitter from std only; xorshift over the wall clock is plenty for
// request pacing.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
