use async_trait::async_trait;

use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::remote::RemoteClassifier;
use magpie_core::salary::extract_salary;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::rss::{self, FeedItem};

/// Title segments that read like a location hint.
const LOCATION_HINTS: [&str; 6] = ["remote", "office", "city", "state", "country", "worldwide"];

/// Adapter for Workday tenants via their RSS feed.
///
/// Workday titles often end in a ` - <location>` segment. The segment
/// is kept in the title and only copied into the location field when
/// it looks like a place rather than a team name.
pub struct WorkdayAdapter<F> {
    name: String,
    slug: String,
    site: String,
    company: String,
    fetch: F,
    remote: RemoteClassifier,
}

impl<F: Fetch> WorkdayAdapter<F> {
    pub fn new(
        slug: impl Into<String>,
        site: Option<String>,
        company: Option<String>,
        fetch: F,
        remote: RemoteClassifier,
    ) -> Self {
        let slug = slug.into();
        Self {
            name: format!("workday:{slug}"),
            site: site.unwrap_or_else(|| slug.clone()),
            company: company.unwrap_or_else(|| slug.clone()),
            slug,
            fetch,
            remote,
        }
    }

    fn parse_item(&self, item: FeedItem) -> JobPosting {
        let location = location_hint(&item.title);
        let is_remote = self.remote.is_remote(
            &item.title,
            &self.company,
            &item.description,
            location.as_deref(),
        );

        let mut job = JobPosting::new(&item.title, &self.company, &item.link, "Workday")
            .with_description(&item.description)
            .with_remote(is_remote);
        if let Some(location) = location {
            job = job.with_location(location);
        }
        if let Some((min, max)) = extract_salary(&format!("{} {}", item.title, item.description)) {
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

fn location_hint(title: &str) -> Option<String> {
    let (_, tail) = title.rsplit_once(" - ")?;
    let tail = tail.trim();
    let lowered = tail.to_lowercase();
    if LOCATION_HINTS.iter().any(|hint| lowered.contains(hint)) {
        Some(tail.to_string())
    } else {
        None
    }
}

#[async_trait]
impl<F: Fetch> SourceAdapter for WorkdayAdapter<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        let url = format!(
            "https://{}.wd1.myworkdayjobs.com/{}/rss",
            self.slug, self.site
        );
        let xml = self.fetch.fetch(&url).await?.into_text()?;
        let items = rss::parse_feed(&xml)?;
        Ok(items.into_iter().map(|item| self.parse_item(item)).collect())
    }
}
