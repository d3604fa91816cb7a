use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::record::JobPosting;

pub const DEFAULT_DAYS_BACK: u32 = 15;

/// Phrases upstreams use instead of a date; all mean "fresh".
const FRESHNESS_PHRASES: &[&str] =
    &["posted today", "posted yesterday", "just posted", "new posting"];

static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*days?\s*ago").expect("valid regex"));
static WEEKS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*weeks?\s*ago").expect("valid regex"));

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Drops postings older than a cutoff of `now − days_back`.
///
/// Records without any recognizable date signal are kept; unknown age is
/// not grounds for dropping.
#[derive(Debug, Clone)]
pub struct RecencyFilter {
    cutoff: DateTime<Utc>,
    days_back: i64,
}

impl RecencyFilter {
    pub fn new(days_back: u32) -> Self {
        Self::anchored(Utc::now(), days_back)
    }

    /// Builds a filter with an explicit "now", so tests are deterministic.
    pub fn anchored(now: DateTime<Utc>, days_back: u32) -> Self {
        Self {
            cutoff: now - Duration::days(i64::from(days_back)),
            days_back: i64::from(days_back),
        }
    }

    pub fn filter(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        let total = jobs.len();
        let fresh: Vec<JobPosting> = jobs.into_iter().filter(|j| self.is_fresh(j)).collect();
        let dropped = total - fresh.len();
        if dropped > 0 {
            tracing::info!(%dropped, kept = %fresh.len(), "Filtered out stale jobs");
        }
        fresh
    }

    pub fn is_fresh(&self, job: &JobPosting) -> bool {
        if let Some(posted) = job.posted_at {
            return posted >= self.cutoff;
        }
        let text = format!("{} {}", job.title, job.description).to_lowercase();
        if FRESHNESS_PHRASES.iter().any(|p| text.contains(p)) {
            return true;
        }
        if let Some(age_days) = relative_age_days(&text) {
            return age_days <= self.days_back;
        }
        true
    }
}

/// Reads `N days ago` / `N weeks ago` out of free text.
fn relative_age_days(text: &str) -> Option<i64> {
    if let Some(cap) = DAYS_AGO.captures(text) {
        if let Ok(days) = cap[1].parse::<i64>() {
            return Some(days);
        }
    }
    if let Some(cap) = WEEKS_AGO.captures(text) {
        if let Ok(weeks) = cap[1].parse::<i64>() {
            return weeks.checked_mul(7);
        }
    }
    None
}

/// Best-effort timestamp parsing across the date shapes upstreams emit:
/// RFC 3339, RFC 2822 (RSS pubDate), then a list of bare formats.
pub fn parse_posted_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.and_utc());
        }
    }
    // Every date-only format above is ten characters; trailing time or
    // timezone junk is ignored.
    let head: String = raw.chars().take(10).collect();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&head, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}
