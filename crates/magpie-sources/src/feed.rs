use async_trait::async_trait;
use serde_json::Value;

use magpie_client::DescriptionCleaner;
use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::remote::RemoteClassifier;
use magpie_core::salary::extract_salary;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::{json, rss};

/// Payload shape of a configured feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Json,
    Rss,
}

/// Adapter for arbitrary job feeds configured by URL.
///
/// JSON feeds get field-alias probing (`title`/`position`/`job_title`
/// and friends) because their schemas are whatever the publisher chose.
/// RSS feeds go through the channel parser and the
/// `"<job> at <company>"` title convention.
pub struct FeedAdapter<F> {
    name: String,
    feed_name: String,
    url: String,
    format: FeedFormat,
    fetch: F,
    remote: RemoteClassifier,
    cleaner: DescriptionCleaner,
}

impl<F: Fetch> FeedAdapter<F> {
    pub fn json(
        feed_name: impl Into<String>,
        url: impl Into<String>,
        fetch: F,
        remote: RemoteClassifier,
        cleaner: DescriptionCleaner,
    ) -> Self {
        Self::new(FeedFormat::Json, feed_name, url, fetch, remote, cleaner)
    }

    pub fn rss(
        feed_name: impl Into<String>,
        url: impl Into<String>,
        fetch: F,
        remote: RemoteClassifier,
        cleaner: DescriptionCleaner,
    ) -> Self {
        Self::new(FeedFormat::Rss, feed_name, url, fetch, remote, cleaner)
    }

    fn new(
        format: FeedFormat,
        feed_name: impl Into<String>,
        url: impl Into<String>,
        fetch: F,
        remote: RemoteClassifier,
        cleaner: DescriptionCleaner,
    ) -> Self {
        let feed_name = feed_name.into();
        let prefix = match format {
            FeedFormat::Json => "json",
            FeedFormat::Rss => "rss",
        };
        Self {
            name: format!("{prefix}:{feed_name}"),
            feed_name,
            url: url.into(),
            format,
            fetch,
            remote,
            cleaner,
        }
    }

    fn parse_json(&self, payload: &Value) -> Vec<JobPosting> {
        let Some(items) = json::jobs_array(payload, &["jobs", "data", "results", "items"]) else {
            tracing::warn!(source = %self.name, "Payload has no job array");
            return Vec::new();
        };

        let mut jobs = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for item in items {
            match self.parse_json_job(item) {
                Some(job) => jobs.push(job),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(source = %self.name, %skipped, "Skipped postings with missing fields");
        }
        jobs
    }

    fn parse_json_job(&self, item: &Value) -> Option<JobPosting> {
        let title = json::pick_str(item, &["title", "position", "job_title"])?;
        let apply_url = json::pick_str(item, &["apply_url", "url", "link", "job_url"])?;
        let company = json::pick_str(item, &["company", "company_name", "author"])
            .unwrap_or(&self.feed_name);
        let description = self.cleaner.clean(
            json::pick_str(item, &["description", "summary", "job_description"])
                .unwrap_or_default(),
        );
        let location = json::pick_str(item, &["location", "job_location"]);

        let is_remote = self.remote.is_remote(title, company, &description, location);

        let mut job = JobPosting::new(title, company, apply_url, &self.feed_name)
            .with_description(&description)
            .with_remote(is_remote);
        if let Some(location) = location {
            job = job.with_location(location);
        }
        if let Some((min, max)) = extract_salary(&format!("{title} {description}")) {
            job = job.with_salary(Some(min), Some(max));
        }
        if let Some(id) = json::id_string(item) {
            job = job.with_source_job_id(id);
        }
        if let Some(posted) = json::posted_at_from(item, json::DATE_KEYS) {
            job = job.with_posted_at(posted);
        }
        Some(job)
    }

    fn parse_rss_item(&self, item: rss::FeedItem) -> JobPosting {
        let (title, company) = match rss::split_title_company(&item.title) {
            Some(split) => split,
            None => {
                let company = item
                    .author
                    .as_deref()
                    .map(rss::author_name)
                    .unwrap_or(&self.feed_name);
                (item.title.clone(), company.to_string())
            }
        };

        let description = self.cleaner.clean(&item.description);
        let is_remote = self.remote.is_remote(&title, &company, &description, None);

        let mut job = JobPosting::new(title.as_str(), company, &item.link, &self.feed_name)
            .with_description(&description)
            .with_remote(is_remote);
        if let Some((min, max)) = extract_salary(&format!("{title} {description}")) {
            job = job.with_salary(Some(min), Some(max));
        }
        if let Some(id) = rss::job_id_from_link(&item.link) {
            job = job.with_source_job_id(id);
        }
        if let Some(posted) = item.published {
            job = job.with_posted_at(posted);
        }
        job
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for FeedAdapter<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        match self.format {
            FeedFormat::Json => {
                let payload = self.fetch.fetch(&self.url).await?.into_json()?;
                Ok(self.parse_json(&payload))
            }
            FeedFormat::Rss => {
                let xml = self.fetch.fetch(&self.url).await?.into_text()?;
                let items = rss::parse_feed(&xml)?;
                Ok(items
                    .into_iter()
                    .map(|item| self.parse_rss_item(item))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::testutil::MockFetch;
    use serde_json::json;

    fn json_adapter(fetch: MockFetch) -> FeedAdapter<MockFetch> {
        FeedAdapter::json(
            "Python Jobs Board",
            "https://feeds.example.com/python.json",
            fetch,
            RemoteClassifier::default(),
            DescriptionCleaner::new(),
        )
    }

    #[tokio::test]
    async fn test_json_feed_probes_field_aliases() {
        let fetch = MockFetch::with_json(json!({
            "results": [
                {
                    "id": 310,
                    "position": "Django Developer",
                    "company_name": "Globex",
                    "summary": "Fully remote role on our $90k - $120k platform team.",
                    "job_url": "https://example.com/jobs/310",
                    "job_location": "Lisbon",
                    "posted_date": "2024-06-10"
                }
            ]
        }));
        let adapter = json_adapter(fetch.clone());
        assert_eq!(adapter.name(), "json:Python Jobs Board");

        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.title, "Django Developer");
        assert_eq!(job.company, "Globex");
        assert_eq!(job.apply_url, "https://example.com/jobs/310");
        assert_eq!(job.location.as_deref(), Some("Lisbon"));
        assert_eq!(job.source, "Python Jobs Board");
        assert_eq!(job.source_job_id.as_deref(), Some("310"));
        assert_eq!(job.salary_min, Some(90_000));
        assert_eq!(job.salary_max, Some(120_000));
        assert!(job.is_remote);
        assert!(job.posted_at.is_some());

        assert_eq!(fetch.calls(), vec!["https://feeds.example.com/python.json"]);
    }

    #[tokio::test]
    async fn test_json_feed_requires_title_and_url() {
        let fetch = MockFetch::with_json(json!({
            "jobs": [
                {"title": "No URL anywhere"},
                {"url": "https://example.com/a"},
                {"title": "Kept", "url": "https://example.com/b"}
            ]
        }));
        let jobs = json_adapter(fetch).scrape().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].company, "Python Jobs Board");
    }

    #[tokio::test]
    async fn test_rss_feed_splits_title_and_falls_back_to_author() {
        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Go Jobs</title>
    <link>https://example.com</link>
    <description>feed</description>
    <item>
      <title>Go Engineer at Initech</title>
      <link>https://example.com/jobs/go-engineer-88</link>
      <description>&lt;p&gt;Fully remote, worldwide.&lt;/p&gt;</description>
    </item>
    <item>
      <title>Platform Engineer</title>
      <link>https://example.com/jobs/platform-91</link>
      <author>jobs@globex.test (Globex)</author>
    </item>
  </channel>
</rss>"#;
        let fetch = MockFetch::with_text(feed);
        let adapter = FeedAdapter::rss(
            "Go Jobs",
            "https://example.com/feed.rss",
            fetch,
            RemoteClassifier::default(),
            DescriptionCleaner::new(),
        );
        assert_eq!(adapter.name(), "rss:Go Jobs");

        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.title, "Go Engineer");
        assert_eq!(first.company, "Initech");
        assert_eq!(first.source, "Go Jobs");
        assert_eq!(first.source_job_id.as_deref(), Some("go-engineer-88"));
        assert!(first.is_remote);
        assert!(!first.description.contains('<'));

        let second = &jobs[1];
        assert_eq!(second.title, "Platform Engineer");
        assert_eq!(second.company, "Globex");
        assert!(!second.is_remote);
    }

    #[tokio::test]
    async fn test_rss_company_defaults_to_feed_name() {
        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Feed</title>
    <link>https://example.com</link>
    <description>feed</description>
    <item>
      <title>Lone Posting</title>
      <link>https://example.com/jobs/1</link>
    </item>
  </channel>
</rss>"#;
        let adapter = FeedAdapter::rss(
            "Nordic Jobs",
            "https://example.com/feed.rss",
            MockFetch::with_text(feed),
            RemoteClassifier::default(),
            DescriptionCleaner::new(),
        );
        let jobs = adapter.scrape().await.unwrap();
        assert_eq!(jobs[0].company, "Nordic Jobs");
    }
}
