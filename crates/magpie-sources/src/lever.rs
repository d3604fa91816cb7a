use async_trait::async_trait;
use serde_json::Value;

use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::remote::RemoteClassifier;
use magpie_core::salary::extract_salary;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::json;

/// Adapter for Lever-hosted boards.
///
/// The postings API returns a flat array. `createdAt` is epoch
/// milliseconds and postings may carry `applyUrl`, `hostedUrl`, or
/// neither, in which case the hosted board URL is derived from the id.
pub struct LeverAdapter<F> {
    name: String,
    slug: String,
    company: String,
    fetch: F,
    remote: RemoteClassifier,
}

impl<F: Fetch> LeverAdapter<F> {
    pub fn new(
        slug: impl Into<String>,
        company: Option<String>,
        fetch: F,
        remote: RemoteClassifier,
    ) -> Self {
        let slug = slug.into();
        Self {
            name: format!("lever:{slug}"),
            company: company.unwrap_or_else(|| slug.clone()),
            slug,
            fetch,
            remote,
        }
    }

    fn parse(&self, payload: &Value) -> Vec<JobPosting> {
        let Some(items) = json::jobs_array(payload, &[]) else {
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
        let title = json::pick_str(item, &["text"])?;
        let id = json::pick_str(item, &["id"]);
        let apply_url = json::pick_str(item, &["applyUrl", "hostedUrl"])
            .map(String::from)
            .or_else(|| id.map(|id| format!("https://jobs.lever.co/{}/{id}", self.slug)))?;
        let description = json::pick_str(item, &["description", "descriptionPlain"]).unwrap_or_default();

        let location = item
            .pointer("/categories/location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let is_remote = self
            .remote
            .is_remote(title, &self.company, description, location);

        let mut job = JobPosting::new(title, &self.company, apply_url, "Lever")
            .with_description(description)
            .with_remote(is_remote);
        if let Some(location) = location {
            job = job.with_location(location);
        }
        if let Some((min, max)) = extract_salary(&format!("{title} {description}")) {
            job = job.with_salary(Some(min), Some(max));
        }
        if let Some(id) = id {
            job = job.with_source_job_id(id);
        }
        if let Some(posted) = json::posted_at_from(item, &["createdAt"]) {
            job = job.with_posted_at(posted);
        }
        Some(job)
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for LeverAdapter<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let url = format!("https://api.lever.co/v0/postings/{}?mode=json", self.slug);
        let payload = self.fetch.fetch(&url).await?.into_json()?;
        Ok(self.parse(&payload))
    }
}
