use async_trait::async_trait;
use serde_json::Value;

use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::remote::RemoteClassifier;
use magpie_core::salary::extract_salary;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::json;

/// Adapter for Greenhouse-hosted boards.
///
/// Boards API, job array under `"jobs"`: location prefers
/// `location.name` and falls back to the office names joined with a
/// comma.
pub struct GreenhouseAdapter<F> {
    name: String,
    slug: String,
    company: String,
    fetch: F,
    remote: RemoteClassifier,
}

impl<F: Fetch> GreenhouseAdapter<F> {
    pub fn new(
        slug: impl Into<String>,
        company: Option<String>,
        fetch: F,
        remote: RemoteClassifier,
    ) -> Self {
        let slug = slug.into();
        Self {
            name: format!("greenhouse:{slug}"),
            company: company.unwrap_or_else(|| slug.clone()),
            slug,
            fetch,
            remote,
        }
    }

    fn parse(&self, payload: &Value) -> Vec<JobPosting> {
        let Some(items) = json::jobs_array(payload, &["jobs"]) else {
            tracing::warn!(source = %self.name, "Payload has no job array");
            return Vec::new();
        };

        let mut jobs = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for item in items {
            match self.parse_job(item) {
                Some(job) => jobs.push(job),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(source = %self.name, %skipped, "Skipped postings with missing fields");
        }
        jobs
    }

    fn parse_job(&self, item: &Value) -> Option<JobPosting> {
        let title = json::pick_str(item, &["title"])?;
        let apply_url = json::pick_str(item, &["absolute_url"])?;
        let description = json::pick_str(item, &["content", "description"]).unwrap_or_default();

        let location = item
            .pointer("/location/name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| offices_location(item));

        let is_remote = self
            .remote
            .is_remote(title, &self.company, description, location.as_deref());

        let mut job = JobPosting::new(title, &self.company, apply_url, "Greenhouse")
            .with_description(description)
            .with_remote(is_remote);
        if let Some(location) = location {
            job = job.with_location(location);
        }
        if let Some((min, max)) = extract_salary(&format!("{title} {description}")) {
            job = job.with_salary(Some(min), Some(max));
        }
        if let Some(id) = item.get("id").and_then(Value::as_i64) {
            job = job.with_source_job_id(id.to_string());
        }
        if let Some(posted) = json::posted_at_from(item, &["first_published", "updated_at"]) {
            job = job.with_posted_at(posted);
        }
        Some(job)
    }
}

fn offices_location(item: &Value) -> Option<String> {
    let names: Vec<&str> = item
        .get("offices")?
        .as_array()?
        .iter()
        .filter_map(|office| office.get("name").and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for GreenhouseAdapter<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let url = format!(
            "https://boards-api.greenhouse.io/v1/boards/{}/jobs?content=true",
            self.slug
        );
        let payload = self.fetch.fetch(&url).await?.into_json()?;
        Ok(self.parse(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::testutil::MockFetch;
    use serde_json::json;

    fn adapter(fetch: MockFetch) -> GreenhouseAdapter<MockFetch> {
        GreenhouseAdapter::new(
            "acme",
            Some("Acme".to_string()),
            fetch,
            RemoteClassifier::default(),
        )
    }

    #[tokio::test]
    async fn test_scrape_maps_fields() {
        let fetch = MockFetch::with_json(json!({
            "jobs": [
                {
                    "id": 4012,
                    "title": "Backend Engineer",
                    "absolute_url": "https://boards.greenhouse.io/acme/jobs/4012",
                    "location": {"name": "Berlin, Germany"},
                    "content": "Own our $100k - $140k billing platform.",
                    "updated_at": "2024-06-10T08:30:00Z"
                },
                {
                    "title": "Platform Engineer (Remote)",
                    "absolute_url": "https://boards.greenhouse.io/acme/jobs/4013",
                    "offices": [{"name": "London"}, {"name": "Remote"}]
                }
            ]
        }));
        let adapter = adapter(fetch.clone());

        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.title, "Backend Engineer");
        assert_eq!(first.company, "Acme");
        assert_eq!(first.apply_url, "https://boards.greenhouse.io/acme/jobs/4012");
        assert_eq!(first.location.as_deref(), Some("Berlin, Germany"));
        assert_eq!(first.source, "Greenhouse");
        assert_eq!(first.source_job_id.as_deref(), Some("4012"));
        assert_eq!(first.salary_min, Some(100_000));
        assert_eq!(first.salary_max, Some(140_000));
        assert!(first.posted_at.is_some());
        assert!(!first.is_remote);

        let second = &jobs[1];
        assert_eq!(second.location.as_deref(), Some("London, Remote"));
        assert!(second.is_remote);

        assert_eq!(
            fetch.calls(),
            vec!["https://boards-api.greenhouse.io/v1/boards/acme/jobs?content=true"]
        );
    }

    #[tokio::test]
    async fn test_items_without_required_fields_are_skipped() {
        let fetch = MockFetch::with_json(json!({
            "jobs": [
                {"title": "No URL"},
                {"absolute_url": "https://boards.greenhouse.io/acme/jobs/1"},
                {"title": "Kept", "absolute_url": "https://boards.greenhouse.io/acme/jobs/2"}
            ]
        }));
        let jobs = adapter(fetch).scrape().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Kept");
    }

    #[tokio::test]
    async fn test_payload_without_job_array_is_empty() {
        let fetch = MockFetch::with_json(json!({"error": "board not found"}));
        let jobs = adapter(fetch).scrape().await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let fetch = MockFetch::with_error(ScrapeError::Status {
            code: 500,
            url: "https://boards-api.greenhouse.io/v1/boards/acme/jobs?content=true".into(),
        });
        assert!(adapter(fetch).scrape().await.is_err());
    }
}
