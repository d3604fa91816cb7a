//! RSS channel parsing shared by the feed-based adapters.

use chrono::{DateTime, Utc};
use rss::Channel;

use magpie_core::error::ScrapeError;
use magpie_core::recency::parse_posted_at;

/// One feed item with the fields the adapters care about. Items missing
/// a title or link are dropped during parsing.
#[derive(Debug, Clone)]
pub(crate) struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

pub(crate) fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, ScrapeError> {
    let channel = Channel::read_from(xml.as_bytes())
        .map_err(|e| ScrapeError::Parse(format!("invalid RSS feed: {e}")))?;

    Ok(channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.trim();
            let link = item.link()?.trim();
            if title.is_empty() || link.is_empty() {
                return None;
            }
            Some(FeedItem {
                title: title.to_string(),
                link: link.to_string(),
                description: item.description().unwrap_or_default().trim().to_string(),
                author: item
                    .author()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from),
                published: item.pub_date().and_then(parse_posted_at),
            })
        })
        .collect())
}

/// Display name from an RSS author field, which is commonly formatted
/// as `email (Name)`.
pub(crate) fn author_name(raw: &str) -> &str {
    match (raw.rfind('('), raw.rfind(')')) {
        (Some(open), Some(close)) if open < close => raw[open + 1..close].trim(),
        _ => raw.trim(),
    }
}

/// Last path segment of a posting link, used as the source job id.
pub(crate) fn job_id_from_link(link: &str) -> Option<String> {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Splits `"<job> at <company>"` on the **last** `" at "`; company names
/// may themselves contain "at".
pub(crate) fn split_title_company(raw: &str) -> Option<(String, String)> {
    let idx = raw.rfind(" at ")?;
    let title = raw[..idx].trim();
    let company = raw[idx + " at ".len()..].trim();
    if title.is_empty() || company.is_empty() {
        return None;
    }
    Some((title.to_string(), company.to_string()))
}
