use async_trait::async_trait;
use serde_json::Value;

use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::remote::RemoteClassifier;
use magpie_core::salary::extract_salary;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::json;

/// Adapter for SmartRecruiters-hosted boards.
///
/// Postings live under `"content"`. The list payload has no job ad
/// body, so the description falls back to whatever the item carries.
pub struct SmartRecruitersAdapter<F> {
    name: String,
    slug: String,
    company: String,
    fetch: F,
    remote: RemoteClassifier,
}

impl<F: Fetch> SmartRecruitersAdapter<F> {
    pub fn new(
        slug: impl Into<String>,
        company: Option<String>,
        fetch: F,
        remote: RemoteClassifier,
    ) -> Self {
        let slug = slug.into();
        Self {
            name: format!("smartrecruiters:{slug}"),
            company: company.unwrap_or_else(|| slug.clone()),
            slug,
            fetch,
            remote,
        }
    }

    fn parse(&self, payload: &Value) -> Vec<JobPosting> {
        let Some(items) = json::jobs_array(payload, &["content", "postings", "data"]) else {
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
        let title = json::pick_str(item, &["name", "title"])?;
        let id = json::pick_str(item, &["id", "uuid"]);
        let apply_url = json::pick_str(item, &["ref"])
            .map(String::from)
            .or_else(|| {
                id.map(|id| format!("https://jobs.smartrecruiters.com/{}/{id}", self.slug))
            })?;

        let description = item
            .pointer("/jobAd/sections/jobDescription/text")
            .and_then(Value::as_str)
            .or_else(|| json::pick_str(item, &["description"]))
            .unwrap_or_default();

        let location = smartrecruiters_location(item);

        let is_remote =
            self.remote
                .is_remote(title, &self.company, description, location.as_deref());

        let mut job = JobPosting::new(title, &self.company, apply_url, "SmartRecruiters")
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
        if let Some(posted) = json::posted_at_from(item, &["releasedDate"]) {
            job = job.with_posted_at(posted);
        }
        Some(job)
    }
}

fn smartrecruiters_location(item: &Value) -> Option<String> {
    let location = item.get("location")?;
    let city = location
        .get("city")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let country = location
        .get("country")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match (city, country) {
        (Some(city), Some(country)) => Some(format!("{city}, {country}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for SmartRecruitersAdapter<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let url = format!(
            "https://api.smartrecruiters.com/v1/companies/{}/postings?limit=100",
            self.slug
        );
        let payload = self.fetch.fetch(&url).await?.into_json()?;
        Ok(self.parse(&payload))
    }
}
