use std::time::Duration;

use magpie_client::{DescriptionCleaner, FetchClient};
use magpie_core::config::{FetchSettings, SourceEntry, SourceSpec, SourcesConfig};
use magpie_core::error::ScrapeError;
use magpie_core::remote::{RemoteClassifier, RemoteRules};
use magpie_core::traits::SourceAdapter;

use crate::boards::{HimalayasAdapter, RemoteOkAdapter, WeWorkRemotelyAdapter};
use crate::careers::CareerPageAdapter;
use crate::feed::FeedAdapter;
use crate::greenhouse::GreenhouseAdapter;
use crate::lever::LeverAdapter;
use crate::smartrecruiters::SmartRecruitersAdapter;
use crate::workday::WorkdayAdapter;

/// ATS platform recognized from a board URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtsKind {
    Greenhouse,
    Lever,
    SmartRecruiters,
    Workday,
}

impl AtsKind {
    /// Guesses the platform behind a careers URL.
    pub fn detect(url: &str) -> Option<Self> {
        let url = url.to_lowercase();
        if url.contains("greenhouse.io") {
            Some(Self::Greenhouse)
        } else if url.contains("lever.co") {
            Some(Self::Lever)
        } else if url.contains("smartrecruiters.com") {
            Some(Self::SmartRecruiters)
        } else if url.contains("myworkdayjobs.com") {
            Some(Self::Workday)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greenhouse => "greenhouse",
            Self::Lever => "lever",
            Self::SmartRecruiters => "smartrecruiters",
            Self::Workday => "workday",
        }
    }
}

/// Builds one adapter per configured source.
///
/// Each adapter owns its own fetch client so per-source rate limits
/// never interfere with each other. A source whose client cannot be
/// built is logged and skipped; the rest of the run proceeds.
pub fn build_adapters(config: &SourcesConfig) -> Vec<Box<dyn SourceAdapter>> {
    let rules =
        RemoteRules::default().with_company_overrides(config.remote_overrides.iter().cloned());
    let remote = RemoteClassifier::new(rules);
    let cleaner = DescriptionCleaner::new();

    let mut adapters = Vec::with_capacity(config.sources.len());
    for entry in &config.sources {
        match build_adapter(entry, &remote, &cleaner) {
            Ok(adapter) => adapters.push(adapter),
            Err(error) => {
                tracing::error!(kind = entry.spec.kind(), %error, "Skipping source, client setup failed");
            }
        }
    }
    adapters
}

fn build_adapter(
    entry: &SourceEntry,
    remote: &RemoteClassifier,
    cleaner: &DescriptionCleaner,
) -> Result<Box<dyn SourceAdapter>, ScrapeError> {
    let adapter: Box<dyn SourceAdapter> = match &entry.spec {
        SourceSpec::Greenhouse { slug, company } => Box::new(GreenhouseAdapter::new(
            slug.clone(),
            company.clone(),
            api_client(entry.fetch)?,
            remote.clone(),
        )),
        SourceSpec::Lever { slug, company } => Box::new(LeverAdapter::new(
            slug.clone(),
            company.clone(),
            api_client(entry.fetch)?,
            remote.clone(),
        )),
        SourceSpec::SmartRecruiters { slug, company } => Box::new(SmartRecruitersAdapter::new(
            slug.clone(),
            company.clone(),
            api_client(entry.fetch)?,
            remote.clone(),
        )),
        SourceSpec::Workday {
            slug,
            site,
            company,
        } => Box::new(WorkdayAdapter::new(
            slug.clone(),
            site.clone(),
            company.clone(),
            api_client(entry.fetch)?,
            remote.clone(),
        )),
        SourceSpec::RemoteOk => {
            Box::new(RemoteOkAdapter::new(board_client(entry.fetch)?))
        }
        SourceSpec::Himalayas => {
            Box::new(HimalayasAdapter::new(board_client(entry.fetch)?))
        }
        SourceSpec::WeWorkRemotely { url } => Box::new(WeWorkRemotelyAdapter::new(
            url.clone(),
            api_client(entry.fetch)?,
            cleaner.clone(),
        )),
        SourceSpec::RssFeed { name, url } => Box::new(FeedAdapter::rss(
            name.clone(),
            url.clone(),
            api_client(entry.fetch)?,
            remote.clone(),
            cleaner.clone(),
        )),
        SourceSpec::JsonFeed { name, url } => Box::new(FeedAdapter::json(
            name.clone(),
            url.clone(),
            api_client(entry.fetch)?,
            remote.clone(),
            cleaner.clone(),
        )),
        SourceSpec::Careers {
            company,
            url,
            location,
        } => Box::new(CareerPageAdapter::new(
            company.clone(),
            url.clone(),
            location.clone(),
            browser_client(entry.fetch)?,
            remote.clone(),
        )),
    };
    Ok(adapter)
}

fn api_client(settings: FetchSettings) -> Result<FetchClient, ScrapeError> {
    client_builder(settings).build()
}

/// Boards like RemoteOK reject non-browser user agents on their JSON
/// endpoints.
fn board_client(settings: FetchSettings) -> Result<FetchClient, ScrapeError> {
    client_builder(settings)
        .browser_headers()
        .header("Accept", "application/json")
        .build()
}

fn browser_client(settings: FetchSettings) -> Result<FetchClient, ScrapeError> {
    client_builder(settings).browser_headers().build()
}

fn client_builder(settings: FetchSettings) -> magpie_client::FetchClientBuilder {
    FetchClient::builder()
        .rate_limit(Duration::from_secs(settings.rate_limit_secs))
        .timeout(Duration::from_secs(settings.timeout_secs))
        .max_attempts(settings.max_attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_ats_platforms() {
        assert_eq!(
            AtsKind::detect("https://boards.greenhouse.io/acme"),
            Some(AtsKind::Greenhouse)
        );
        assert_eq!(
            AtsKind::detect("https://jobs.lever.co/acme"),
            Some(AtsKind::Lever)
        );
        assert_eq!(
            AtsKind::detect("https://jobs.smartrecruiters.com/Acme"),
            Some(AtsKind::SmartRecruiters)
        );
        assert_eq!(
            AtsKind::detect("https://acme.wd1.MyWorkdayJobs.com/External"),
            Some(AtsKind::Workday)
        );
        assert_eq!(AtsKind::detect("https://acme.example/careers"), None);
    }

    #[test]
    fn test_build_adapters_covers_every_source_kind() {
        let config = SourcesConfig::from_json(
            r#"{
                "sources": [
                    {"kind": "greenhouse", "slug": "acme", "name": "Acme"},
                    {"kind": "lever", "slug": "acme"},
                    {"kind": "smartrecruiters", "slug": "acme"},
                    {"kind": "workday", "slug": "acme", "site": "External"},
                    {"kind": "remoteok"},
                    {"kind": "himalayas"},
                    {"kind": "weworkremotely"},
                    {"kind": "rss", "name": "Go Jobs", "url": "https://example.com/feed.rss"},
                    {"kind": "json", "name": "Py Jobs", "url": "https://example.com/jobs.json"},
                    {"kind": "careers", "name": "Acme", "url": "https://acme.example/careers"}
                ]
            }"#,
        )
        .unwrap();

        let adapters = build_adapters(&config);
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "greenhouse:acme",
                "lever:acme",
                "smartrecruiters:acme",
                "workday:acme",
                "remoteok",
                "himalayas",
                "weworkremotely",
                "rss:Go Jobs",
                "json:Py Jobs",
                "careers:Acme",
            ]
        );
    }
}
