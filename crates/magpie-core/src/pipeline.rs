use std::collections::{BTreeMap, HashSet};
use std::fmt;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::dedup::Deduplicator;
use crate::domain::{Domain, DomainClassifier};
use crate::error::ScrapeError;
use crate::recency::RecencyFilter;
use crate::record::JobPosting;
use crate::traits::SourceAdapter;

/// Hard ceiling on concurrently scraped sources.
pub const MAX_SOURCE_CONCURRENCY: usize = 10;

/// Run phases after fetching, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Aggregated,
    Classified,
    Deduplicated,
    Filtered,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Aggregated => "aggregated",
            Phase::Classified => "classified",
            Phase::Deduplicated => "deduplicated",
            Phase::Filtered => "filtered",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted while a run progresses.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    RunStarted { sources: usize },
    SourceStarted { source: &'a str },
    SourceFinished { source: &'a str, count: usize },
    SourceFailed { source: &'a str, error: &'a ScrapeError },
    PhaseFinished { phase: Phase, count: usize },
    RunFinished { unique: usize, failed_sources: usize },
}

/// Observer hook for pipeline progress. The default implementation
/// ignores everything.
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::RunStarted { sources } => {
                tracing::info!(%sources, "Scrape run started");
            }
            PipelineEvent::SourceStarted { source } => {
                tracing::info!(%source, "Scraping source");
            }
            PipelineEvent::SourceFinished { source, count } => {
                tracing::info!(%source, %count, "Source finished");
            }
            PipelineEvent::SourceFailed { source, error } => {
                tracing::warn!(%source, %error, "Source failed, continuing without it");
            }
            PipelineEvent::PhaseFinished { phase, count } => {
                tracing::debug!(%phase, %count, "Phase finished");
            }
            PipelineEvent::RunFinished { unique, failed_sources } => {
                tracing::info!(%unique, %failed_sources, "Scrape run finished");
            }
        }
    }
}

/// Outcome of one source, kept in source-processing order.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// End-of-run summary.
///
/// A run that completed with failing sources is distinguishable from one
/// that produced nothing: the per-source outcomes carry the errors.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scraped_count: usize,
    pub unique_count: usize,
    pub per_source: Vec<SourceOutcome>,
    pub per_domain: BTreeMap<Domain, usize>,
    pub failed_sources: usize,
}

/// Final record set plus its report.
#[derive(Debug)]
pub struct RunOutcome {
    pub jobs: Vec<JobPosting>,
    pub report: RunReport,
}

/// Batch orchestrator: fetch every source, then classify, deduplicate,
/// and optionally drop stale postings.
///
/// Sources are isolated; one adapter failing (or being cancelled) costs
/// only its own contribution. Configuration failures surface before a
/// pipeline is ever built, so nothing at or below this level terminates
/// the process. Aggregate order is source-processing order; within a
/// source, upstream order.
pub struct Pipeline<R: PipelineReporter = TracingReporter> {
    domains: DomainClassifier,
    dedup: Deduplicator,
    concurrency: usize,
    days_back: Option<u32>,
    cancel: CancellationToken,
    reporter: R,
}

impl Default for Pipeline<TracingReporter> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline<TracingReporter> {
    pub fn new() -> Self {
        Self {
            domains: DomainClassifier::new(),
            dedup: Deduplicator::new(),
            concurrency: 1,
            days_back: None,
            cancel: CancellationToken::new(),
            reporter: TracingReporter,
        }
    }
}

impl<R: PipelineReporter> Pipeline<R> {
    /// Sets how many sources are scraped at once, clamped to
    /// `1..=MAX_SOURCE_CONCURRENCY`. One is the default: fully
    /// sequential, easiest on fragile upstreams.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_SOURCE_CONCURRENCY);
        self
    }

    /// Enables the recency filter with a cutoff of now minus `days_back`
    /// days; `None` keeps postings of any age.
    pub fn with_days_back(mut self, days_back: Option<u32>) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn with_deduplicator(mut self, dedup: Deduplicator) -> Self {
        self.dedup = dedup;
        self
    }

    /// Token observed between and during source fetches; cancelling it
    /// ends the run early with whatever was already collected.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_reporter<R2: PipelineReporter>(self, reporter: R2) -> Pipeline<R2> {
        Pipeline {
            domains: self.domains,
            dedup: self.dedup,
            concurrency: self.concurrency,
            days_back: self.days_back,
            cancel: self.cancel,
            reporter,
        }
    }

    /// Runs the full pipeline over `adapters`.
    ///
    /// `known_urls` seeds the deduplicator with apply URLs that survived
    /// earlier runs; it is never mutated here.
    pub async fn run(
        &self,
        adapters: &[Box<dyn SourceAdapter>],
        known_urls: &HashSet<String>,
    ) -> RunOutcome {
        self.reporter.report(PipelineEvent::RunStarted {
            sources: adapters.len(),
        });

        // buffered() keeps results in stream order, so the aggregate
        // order stays the configuration order at any concurrency.
        let results: Vec<(String, Result<Vec<JobPosting>, ScrapeError>)> =
            stream::iter(adapters.iter().map(|a| self.scrape_source(a.as_ref())))
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut jobs: Vec<JobPosting> = Vec::new();
        let mut per_source = Vec::with_capacity(results.len());
        let mut failed_sources = 0usize;
        for (source, result) in results {
            match result {
                Ok(mut batch) => {
                    per_source.push(SourceOutcome {
                        source,
                        count: batch.len(),
                        error: None,
                    });
                    jobs.append(&mut batch);
                }
                Err(error) => {
                    failed_sources += 1;
                    per_source.push(SourceOutcome {
                        source,
                        count: 0,
                        error: Some(error.to_string()),
                    });
                }
            }
        }
        let scraped_count = jobs.len();
        self.reporter.report(PipelineEvent::PhaseFinished {
            phase: Phase::Aggregated,
            count: scraped_count,
        });

        for job in &mut jobs {
            job.domain = self.domains.classify(&job.title, &job.description);
        }
        self.reporter.report(PipelineEvent::PhaseFinished {
            phase: Phase::Classified,
            count: jobs.len(),
        });

        let jobs = self.dedup.dedupe(jobs, known_urls);
        self.reporter.report(PipelineEvent::PhaseFinished {
            phase: Phase::Deduplicated,
            count: jobs.len(),
        });

        let jobs = match self.days_back {
            Some(days) => {
                let fresh = RecencyFilter::new(days).filter(jobs);
                self.reporter.report(PipelineEvent::PhaseFinished {
                    phase: Phase::Filtered,
                    count: fresh.len(),
                });
                fresh
            }
            None => jobs,
        };
        let unique_count = jobs.len();

        let mut per_domain: BTreeMap<Domain, usize> = BTreeMap::new();
        for job in &jobs {
            *per_domain.entry(job.domain).or_default() += 1;
        }

        self.reporter.report(PipelineEvent::RunFinished {
            unique: jobs.len(),
            failed_sources,
        });

        RunOutcome {
            report: RunReport {
                scraped_count,
                unique_count,
                per_source,
                per_domain,
                failed_sources,
            },
            jobs,
        }
    }

    async fn scrape_source(
        &self,
        adapter: &dyn SourceAdapter,
    ) -> (String, Result<Vec<JobPosting>, ScrapeError>) {
        let name = adapter.name().to_string();
        self.reporter
            .report(PipelineEvent::SourceStarted { source: &name });
        let result = tokio::select! {
            result = adapter.scrape() => result,
            () = self.cancel.cancelled() => Err(ScrapeError::Cancelled),
        };
        match &result {
            Ok(jobs) => self.reporter.report(PipelineEvent::SourceFinished {
                source: &name,
                count: jobs.len(),
            }),
            Err(error) => self.reporter.report(PipelineEvent::SourceFailed {
                source: &name,
                error,
            }),
        }
        (name, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FailingAdapter, PendingAdapter, RecordingReporter, StaticAdapter};
    use chrono::{Duration, Utc};

    fn job(title: &str, company: &str, url: &str) -> JobPosting {
        JobPosting::new(title, company, url, "Test")
    }

    fn titles(jobs: &[JobPosting]) -> Vec<&str> {
        jobs.iter().map(|j| j.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_aggregate_preserves_source_order() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(StaticAdapter::new(
                "alpha",
                vec![
                    job("A1", "Acme", "https://a.dev/1"),
                    job("A2", "Acme", "https://a.dev/2"),
                ],
            )),
            Box::new(StaticAdapter::new(
                "beta",
                vec![job("B1", "Globex", "https://b.dev/1")],
            )),
        ];
        let outcome = Pipeline::new()
            .with_concurrency(2)
            .run(&adapters, &HashSet::new())
            .await;
        assert_eq!(titles(&outcome.jobs), vec!["A1", "A2", "B1"]);
        assert_eq!(outcome.report.scraped_count, 3);
        assert_eq!(outcome.report.unique_count, 3);
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(StaticAdapter::new(
                "good",
                vec![job("A", "Acme", "https://a.dev/1")],
            )),
            Box::new(FailingAdapter::new("bad", "connection reset")),
            Box::new(StaticAdapter::new(
                "also-good",
                vec![job("B", "Globex", "https://b.dev/1")],
            )),
        ];
        let reporter = RecordingReporter::new();
        let outcome = Pipeline::new()
            .with_reporter(reporter.clone())
            .run(&adapters, &HashSet::new())
            .await;

        assert_eq!(titles(&outcome.jobs), vec!["A", "B"]);
        assert_eq!(outcome.report.failed_sources, 1);
        let bad = &outcome.report.per_source[1];
        assert_eq!(bad.source, "bad");
        assert_eq!(bad.count, 0);
        assert!(bad.error.as_deref().unwrap().contains("connection reset"));
        assert!(reporter.events().contains(&"source_failed:bad".to_string()));
    }

    #[tokio::test]
    async fn test_domains_are_classified() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(StaticAdapter::new(
            "alpha",
            vec![job("Senior Python Developer", "Acme", "https://a.dev/1")],
        ))];
        let outcome = Pipeline::new().run(&adapters, &HashSet::new()).await;
        assert_eq!(outcome.jobs[0].domain, Domain::Python);
        assert_eq!(outcome.report.per_domain.get(&Domain::Python), Some(&1));
    }

    #[tokio::test]
    async fn test_known_urls_are_excluded() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(StaticAdapter::new(
            "alpha",
            vec![
                job("A", "Acme", "https://a.dev/1"),
                job("B", "Acme", "https://a.dev/2"),
            ],
        ))];
        let known: HashSet<String> = ["https://a.dev/1".to_string()].into();
        let outcome = Pipeline::new().run(&adapters, &known).await;
        assert_eq!(titles(&outcome.jobs), vec!["B"]);
        assert_eq!(outcome.report.scraped_count, 2);
        assert_eq!(outcome.report.unique_count, 1);
    }

    #[tokio::test]
    async fn test_recency_filter_drops_stale_postings() {
        let stale = job("Old", "Acme", "https://a.dev/1")
            .with_posted_at(Utc::now() - Duration::days(40));
        let undated = job("Undated", "Acme", "https://a.dev/2");
        let adapters: Vec<Box<dyn SourceAdapter>> =
            vec![Box::new(StaticAdapter::new("alpha", vec![stale, undated]))];
        let outcome = Pipeline::new()
            .with_days_back(Some(15))
            .run(&adapters, &HashSet::new())
            .await;
        assert_eq!(titles(&outcome.jobs), vec!["Undated"]);
    }

    #[tokio::test]
    async fn test_reporter_sees_the_full_lifecycle() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(StaticAdapter::new(
            "alpha",
            vec![job("A", "Acme", "https://a.dev/1")],
        ))];
        let reporter = RecordingReporter::new();
        Pipeline::new()
            .with_reporter(reporter.clone())
            .run(&adapters, &HashSet::new())
            .await;
        assert_eq!(
            reporter.events(),
            vec![
                "run_started:1",
                "source_started:alpha",
                "source_finished:alpha:1",
                "phase:aggregated:1",
                "phase:classified:1",
                "phase:deduplicated:1",
                "run_finished:1:0",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_keeps_partial_results() {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(StaticAdapter::new(
                "fast",
                vec![job("A", "Acme", "https://a.dev/1")],
            )),
            Box::new(PendingAdapter::new("stuck")),
        ];
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = Pipeline::new()
            .with_cancellation(cancel)
            .run(&adapters, &HashSet::new())
            .await;

        assert_eq!(titles(&outcome.jobs), vec!["A"]);
        assert_eq!(outcome.report.failed_sources, 1);
        assert_eq!(outcome.report.per_source[1].source, "stuck");
        assert!(
            outcome.report.per_source[1]
                .error
                .as_deref()
                .unwrap()
                .contains("Cancelled")
        );
    }
}
