//! Test doubles shared by unit tests across the workspace.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::ScrapeError;
use crate::pipeline::{PipelineEvent, PipelineReporter};
use crate::record::JobPosting;
use crate::traits::{Fetch, Payload, SourceAdapter};

// ---------------------------------------------------------------------------
// MockFetch
// ---------------------------------------------------------------------------

/// Scripted [`Fetch`] implementation.
///
/// Responses are queued and handed out one per call, in order; calls past
/// the end of the queue get a 404. Fetched URLs are recorded so tests can
/// assert on probe order.
#[derive(Clone, Default)]
pub struct MockFetch {
    responses: Arc<Mutex<VecDeque<Result<Payload, ScrapeError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<Result<Payload, ScrapeError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    pub fn with_json(value: serde_json::Value) -> Self {
        Self::with_responses(vec![Ok(Payload::Json(value))])
    }

    pub fn with_text(body: impl Into<String>) -> Self {
        Self::with_responses(vec![Ok(Payload::Text(body.into()))])
    }

    pub fn with_error(error: ScrapeError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetch for MockFetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Payload, ScrapeError>> + Send {
        self.calls.lock().unwrap().push(url.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        let url = url.to_string();
        async move { next.unwrap_or(Err(ScrapeError::Status { code: 404, url })) }
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Adapter that returns a fixed batch of jobs.
pub struct StaticAdapter {
    name: String,
    jobs: Vec<JobPosting>,
}

impl StaticAdapter {
    pub fn new(name: impl Into<String>, jobs: Vec<JobPosting>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for StaticAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        Ok(self.jobs.clone())
    }
}

/// Adapter that always fails.
pub struct FailingAdapter {
    name: String,
    message: String,
}

impl FailingAdapter {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for FailingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        Err(ScrapeError::Generic(self.message.clone()))
    }
}

/// Adapter that never completes; pair with a cancellation token.
pub struct PendingAdapter {
    name: String,
}

impl PendingAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for PendingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records event labels for assertions.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineReporter for RecordingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        let label = match event {
            PipelineEvent::RunStarted { sources } => format!("run_started:{sources}"),
            PipelineEvent::SourceStarted { source } => format!("source_started:{source}"),
            PipelineEvent::SourceFinished { source, count } => {
                format!("source_finished:{source}:{count}")
            }
            PipelineEvent::SourceFailed { source, .. } => format!("source_failed:{source}"),
            PipelineEvent::PhaseFinished { phase, count } => format!("phase:{phase}:{count}"),
            PipelineEvent::RunFinished { unique, failed_sources } => {
                format!("run_finished:{unique}:{failed_sources}")
            }
        };
        self.events.lock().unwrap().push(label);
    }
}
