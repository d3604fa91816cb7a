//! Remote-first job boards. Every posting from these sources is remote
//! by definition, so the classifier is not consulted.

use async_trait::async_trait;
use serde_json::Value;

use magpie_client::DescriptionCleaner;
use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::{json, rss};

const REMOTEOK_API: &str = "https://remoteok.com/api";
const HIMALAYAS_API: &str = "https://himalayas.app/jobs/api?limit=100";
const WWR_FEED: &str = "https://weworkremotely.com/remote-jobs.rss";

/// Newest items to keep from the We Work Remotely feed.
const WWR_ITEM_CAP: usize = 50;

/// Adapter for the RemoteOK API.
pub struct RemoteOkAdapter<F> {
    fetch: F,
}

impl<F: Fetch> RemoteOkAdapter<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }

    fn parse_job(&self, item: &Value) -> Option<JobPosting> {
        let title = json::pick_str(item, &["position"])?;
        let company = json::pick_str(item, &["company"])?;
        let id = json::id_string(item);

        let apply_url = json::pick_str(item, &["url"])
            .map(String::from)
            .or_else(|| {
                id.as_deref()
                    .map(|id| format!("https://remoteok.com/remote-jobs/{id}"))
            })?;

        let mut description = json::pick_str(item, &["description"])
            .unwrap_or_default()
            .to_string();
        if let Some(tags) = item.get("tags").and_then(Value::as_array) {
            let tags: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
            if !tags.is_empty() {
                description.push_str(&format!(" Skills: {}", tags.join(", ")));
            }
        }

        let mut job = JobPosting::new(title, company, apply_url, "RemoteOK")
            .with_description(description.trim())
            .with_location("Remote Worldwide")
            .with_remote(true)
            .with_salary(
                json::pick_i64(item, &["salary_min"]),
                json::pick_i64(item, &["salary_max"]),
            );
        if let Some(id) = id {
            job = job.with_source_job_id(id);
        }
        if let Some(posted) = json::posted_at_from(item, &["date", "epoch"]) {
            job = job.with_posted_at(posted);
        }
        Some(job)
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for RemoteOkAdapter<F> {
    fn name(&self) -> &str {
        "remoteok"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let payload = self.fetch.fetch(REMOTEOK_API).await?.into_json()?;
        let Some(items) = payload.as_array() else {
            tracing::warn!(source = self.name(), "Payload is not an array");
            return Ok(Vec::new());
        };

        // The first array element is API metadata, not a job.
        let mut jobs = Vec::new();
        let mut skipped = 0usize;
        for item in items.iter().skip(1) {
            match self.parse_job(item) {
                Some(job) => jobs.push(job),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(source = self.name(), %skipped, "Skipped postings with missing fields");
        }
        Ok(jobs)
    }
}

/// Adapter for the Himalayas jobs API.
pub struct HimalayasAdapter<F> {
    fetch: F,
}

impl<F: Fetch> HimalayasAdapter<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }

    fn parse_job(&self, item: &Value) -> Option<JobPosting> {
        let title = json::pick_str(item, &["title"])?;
        let company = item
            .pointer("/company/name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown");
        let id = json::id_string(item);

        let apply_url = json::pick_str(item, &["url", "applicationLink"])
            .map(String::from)
            .or_else(|| id.as_deref().map(|id| format!("https://himalayas.app/jobs/{id}")))?;

        let mut job = JobPosting::new(title, company, apply_url, "Himalayas")
            .with_description(json::pick_str(item, &["description"]).unwrap_or_default())
            .with_location("Remote Worldwide")
            .with_remote(true)
            .with_salary(
                json::pick_i64(item, &["minSalary"]),
                json::pick_i64(item, &["maxSalary"]),
            );
        if let Some(id) = id {
            job = job.with_source_job_id(id);
        }
        if let Some(posted) = json::posted_at_from(item, &["pubDate"]) {
            job = job.with_posted_at(posted);
        }
        Some(job)
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for HimalayasAdapter<F> {
    fn name(&self) -> &str {
        "himalayas"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let payload = self.fetch.fetch(HIMALAYAS_API).await?.into_json()?;
        let Some(items) = json::jobs_array(&payload, &["data"]) else {
            tracing::warn!(source = self.name(), "Payload has no job array");
            return Ok(Vec::new());
        };

        let mut jobs = Vec::new();
        let mut skipped = 0usize;
        for item in items {
            match self.parse_job(item) {
                Some(job) => jobs.push(job),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(source = self.name(), %skipped, "Skipped postings with missing fields");
        }
        Ok(jobs)
    }
}

/// Adapter for the We Work Remotely RSS feed. Item titles follow the
/// `"<job> at <company>"` convention.
pub struct WeWorkRemotelyAdapter<F> {
    url: String,
    fetch: F,
    cleaner: DescriptionCleaner,
}

impl<F: Fetch> WeWorkRemotelyAdapter<F> {
    pub fn new(url: Option<String>, fetch: F, cleaner: DescriptionCleaner) -> Self {
        Self {
            url: url.unwrap_or_else(|| WWR_FEED.to_string()),
            fetch,
            cleaner,
        }
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for WeWorkRemotelyAdapter<F> {
    fn name(&self) -> &str {
        "weworkremotely"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let xml = self.fetch.fetch(&self.url).await?.into_text()?;
        let items = rss::parse_feed(&xml)?;

        let jobs = items
            .into_iter()
            .take(WWR_ITEM_CAP)
            .map(|item| {
                let (title, company) = rss::split_title_company(&item.title)
                    .unwrap_or_else(|| (item.title.clone(), "Unknown".to_string()));

                let mut job = JobPosting::new(title, company, &item.link, "We Work Remotely")
                    .with_description(self.cleaner.clean(&item.description))
                    .with_location("Remote")
                    .with_remote(true);
                if let Some(id) = rss::job_id_from_link(&item.link) {
                    job = job.with_source_job_id(id);
                }
                if let Some(posted) = item.published {
                    job = job.with_posted_at(posted);
                }
                job
            })
            .collect();
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::testutil::MockFetch;
    use serde_json::json;

    #[tokio::test]
    async fn test_remoteok_skips_metadata_element() {
        let fetch = MockFetch::with_json(json!([
            {"legal": "API terms of service"},
            {
                "id": 99421,
                "position": "Rust Engineer",
                "company": "Ferrous",
                "description": "Ship systems code.",
                "tags": ["rust", "tokio"],
                "url": "https://remoteok.com/remote-jobs/99421",
                "salary_min": 90000,
                "salary_max": 130000,
                "date": "2024-06-10T08:30:00+00:00"
            },
            {"position": "No company here"}
        ]));
        let adapter = RemoteOkAdapter::new(fetch.clone());

        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.title, "Rust Engineer");
        assert_eq!(job.company, "Ferrous");
        assert_eq!(job.description, "Ship systems code. Skills: rust, tokio");
        assert_eq!(job.location.as_deref(), Some("Remote Worldwide"));
        assert!(job.is_remote);
        assert_eq!(job.salary_min, Some(90_000));
        assert_eq!(job.salary_max, Some(130_000));
        assert_eq!(job.source_job_id.as_deref(), Some("99421"));
        assert!(job.posted_at.is_some());

        assert_eq!(fetch.calls(), vec![REMOTEOK_API]);
    }

    #[tokio::test]
    async fn test_remoteok_derives_apply_url_from_id() {
        let fetch = MockFetch::with_json(json!([
            {"legal": "terms"},
            {"id": "7", "position": "DX Engineer", "company": "Acme"}
        ]));
        let jobs = RemoteOkAdapter::new(fetch).scrape().await.unwrap();
        assert_eq!(jobs[0].apply_url, "https://remoteok.com/remote-jobs/7");
    }

    #[tokio::test]
    async fn test_himalayas_maps_company_and_epoch_date() {
        let fetch = MockFetch::with_json(json!({
            "data": [
                {
                    "id": 3141,
                    "title": "Platform Engineer",
                    "company": {"name": "Summit"},
                    "description": "Kubernetes all day.",
                    "minSalary": 80000,
                    "maxSalary": 110000,
                    "pubDate": 1_718_008_200i64
                },
                {
                    "id": 3142,
                    "title": "Support Engineer"
                }
            ]
        }));
        let adapter = HimalayasAdapter::new(fetch.clone());

        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.company, "Summit");
        assert_eq!(first.salary_min, Some(80_000));
        assert_eq!(
            first.posted_at.map(|t| t.to_rfc3339()),
            Some("2024-06-10T08:30:00+00:00".to_string())
        );

        let second = &jobs[1];
        assert_eq!(second.company, "Unknown");
        assert_eq!(second.apply_url, "https://himalayas.app/jobs/3142");

        assert_eq!(fetch.calls(), vec![HIMALAYAS_API]);
    }

    #[tokio::test]
    async fn test_wwr_splits_titles_and_cleans_html() {
        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>We Work Remotely</title>
    <link>https://weworkremotely.com</link>
    <description>Remote jobs</description>
    <item>
      <title>Backend Engineer at Acme</title>
      <link>https://weworkremotely.com/remote-jobs/acme-backend-engineer</link>
      <description>&lt;p&gt;Build &lt;b&gt;APIs&lt;/b&gt;.&lt;/p&gt;</description>
      <pubDate>Mon, 10 Jun 2024 08:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Standalone Title</title>
      <link>https://weworkremotely.com/remote-jobs/standalone</link>
    </item>
  </channel>
</rss>"#;
        let fetch = MockFetch::with_text(feed);
        let adapter = WeWorkRemotelyAdapter::new(None, fetch.clone(), DescriptionCleaner::new());

        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.title, "Backend Engineer");
        assert_eq!(first.company, "Acme");
        assert_eq!(first.source, "We Work Remotely");
        assert_eq!(first.location.as_deref(), Some("Remote"));
        assert!(first.is_remote);
        assert!(first.description.contains("APIs"));
        assert!(!first.description.contains("<p>"));
        assert_eq!(
            first.source_job_id.as_deref(),
            Some("acme-backend-engineer")
        );

        let second = &jobs[1];
        assert_eq!(second.title, "Standalone Title");
        assert_eq!(second.company, "Unknown");

        assert_eq!(fetch.calls(), vec![WWR_FEED]);
    }
}
