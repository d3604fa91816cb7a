use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use magpie_core::error::ScrapeError;
use magpie_core::record::JobPosting;
use magpie_core::remote::RemoteClassifier;
use magpie_core::traits::{Fetch, SourceAdapter};

use crate::json;

/// REST paths probed before falling back to HTML scraping.
const API_PROBES: [&str; 4] = ["/api/jobs", "/api/openings", "/jobs.json", "/openings.json"];

/// Listing selectors tried in order; the first one that matches wins.
const LISTING_SELECTORS: [&str; 10] = [
    ".job-listing",
    ".job-item",
    ".career-item",
    ".position",
    ".job-card",
    ".opening",
    "[class*=\"job\"]",
    "[class*=\"career\"]",
    ".vacancy",
    ".role",
];

/// Keywords marking an anchor as job-related in the last-resort pass.
const LINK_KEYWORDS: [&str; 6] = ["job", "career", "position", "opening", "role", "vacancy"];

/// Listing elements considered per page.
const MAX_LISTINGS: usize = 20;

/// Headings shorter than this are navigation noise, not job titles.
const MIN_TITLE_CHARS: usize = 5;

/// One candidate listing pulled out of the page.
struct Listing {
    title: String,
    href: Option<String>,
    text: String,
}

/// Adapter for company career pages without a published API.
///
/// Tries the common REST endpoints first, then scrapes the page HTML
/// with a ladder of listing selectors, then falls back to job-looking
/// anchors. Postings without their own link use the page URL itself,
/// so several listings may share one apply URL.
pub struct CareerPageAdapter<F> {
    name: String,
    company: String,
    url: String,
    source: String,
    default_location: Option<String>,
    fetch: F,
    remote: RemoteClassifier,
}

impl<F: Fetch> CareerPageAdapter<F> {
    pub fn new(
        company: impl Into<String>,
        url: impl Into<String>,
        default_location: Option<String>,
        fetch: F,
        remote: RemoteClassifier,
    ) -> Self {
        let company = company.into();
        Self {
            name: format!("careers:{company}"),
            source: format!("{company} Careers"),
            company,
            url: url.into(),
            default_location,
            fetch,
            remote,
        }
    }

    async fn try_api_endpoints(&self) -> Option<Vec<JobPosting>> {
        let base = self.url.trim_end_matches('/');
        for path in API_PROBES {
            let url = format!("{base}{path}");
            let payload = match self.fetch.fetch(&url).await {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::debug!(source = %self.name, %url, %error, "API probe missed");
                    continue;
                }
            };
            let Ok(value) = payload.into_json() else {
                continue;
            };
            let Some(items) = json::jobs_array(&value, &["jobs", "data", "openings"]) else {
                continue;
            };
            if items.is_empty() {
                continue;
            }

            tracing::debug!(source = %self.name, %url, "Career API endpoint answered");
            return Some(items.iter().filter_map(|item| self.parse_api_job(item)).collect());
        }
        None
    }

    fn parse_api_job(&self, item: &Value) -> Option<JobPosting> {
        let title = json::pick_str(item, &["title"])?;
        if title.chars().count() < 3 {
            return None;
        }
        let description = json::pick_str(item, &["description", "summary"]).unwrap_or_default();
        let apply_url = json::pick_str(item, &["apply_url", "url"]).unwrap_or(&self.url);
        let location = json::pick_str(item, &["location"])
            .map(String::from)
            .or_else(|| self.default_location.clone());

        let is_remote = self
            .remote
            .is_remote(title, &self.company, description, location.as_deref());

        let mut job = JobPosting::new(title, &self.company, apply_url, &self.source)
            .with_description(description)
            .with_remote(is_remote)
            .with_salary(
                json::pick_i64(item, &["salary_min"]),
                json::pick_i64(item, &["salary_max"]),
            );
        if let Some(location) = location {
            job = job.with_location(location);
        }
        if let Some(id) = json::id_string(item) {
            job = job.with_source_job_id(id);
        }
        Some(job)
    }

    fn extract_from_html(&self, page: &str) -> Vec<JobPosting> {
        let document = Html::parse_document(page);
        let listings = collect_listings(&document);
        if listings.is_empty() {
            tracing::warn!(source = %self.name, "No recognizable listings on career page");
            return Vec::new();
        }

        listings
            .into_iter()
            .map(|listing| {
                let apply_url = listing
                    .href
                    .as_deref()
                    .and_then(|href| absolutize(&self.url, href))
                    .unwrap_or_else(|| self.url.clone());

                let location = self.default_location.clone();
                let is_remote = self.remote.is_remote(
                    &listing.title,
                    &self.company,
                    &listing.text,
                    location.as_deref(),
                );

                let mut job = JobPosting::new(&listing.title, &self.company, apply_url, &self.source)
                    .with_description(&listing.text)
                    .with_remote(is_remote);
                if let Some(location) = location {
                    job = job.with_location(location);
                }
                job
            })
            .collect()
    }
}

fn collect_listings(document: &Html) -> Vec<Listing> {
    let mut elements: Vec<ElementRef> = Vec::new();
    for selector in LISTING_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        elements = document.select(&sel).collect();
        if !elements.is_empty() {
            break;
        }
    }

    if elements.is_empty() {
        elements = job_like_anchors(document);
    }

    elements
        .into_iter()
        .take(MAX_LISTINGS)
        .filter_map(|element| listing_from_element(&element))
        .collect()
}

fn job_like_anchors(document: &Html) -> Vec<ElementRef> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter(|element| {
            let html = element.html().to_lowercase();
            LINK_KEYWORDS.iter().any(|keyword| html.contains(keyword))
        })
        .collect()
}

fn listing_from_element(element: &ElementRef) -> Option<Listing> {
    let text = element_text(element);
    let title = heading_text(element).unwrap_or_else(|| truncate_chars(&text, 100));
    if title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }

    let href = if element.value().name() == "a" {
        element.value().attr("href").map(String::from)
    } else {
        None
    }
    .or_else(|| first_anchor_href(element));

    Some(Listing { title, href, text })
}

fn heading_text(element: &ElementRef) -> Option<String> {
    let sel = Selector::parse("h1, h2, h3, h4, h5").ok()?;
    element
        .select(&sel)
        .next()
        .map(|heading| element_text(&heading))
        .filter(|text| !text.is_empty())
}

fn first_anchor_href(element: &ElementRef) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    element
        .select(&sel)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .map(String::from)
}

/// Text content with whitespace collapsed to single spaces.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect::<String>().trim().to_string()
}

fn absolutize(page_url: &str, href: &str) -> Option<String> {
    Url::parse(page_url).ok()?.join(href).ok().map(String::from)
}

#[async_trait]
impl<F: Fetch> SourceAdapter for CareerPageAdapter<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, ScrapeError> {
        if let Some(jobs) = self.try_api_endpoints().await {
            return Ok(jobs);
        }

        tracing::debug!(source = %self.name, "Falling back to HTML scraping");
        let page = self.fetch.fetch(&self.url).await?.into_text()?;
        Ok(self.extract_from_html(&page))
    }
}
