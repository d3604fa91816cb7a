use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ScrapeError;

pub const DEFAULT_RATE_LIMIT_SECS: u64 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DAYS_BACK: u32 = 15;

/// Fetch pacing for one source, resolved from global defaults plus
/// per-entry overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub rate_limit_secs: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            rate_limit_secs: DEFAULT_RATE_LIMIT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// One configured source, validated at load time.
///
/// ATS entries carry an optional display name; the upstream payloads do
/// not repeat the company name, so it comes from configuration (falling
/// back to the slug).
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Greenhouse { slug: String, company: Option<String> },
    Lever { slug: String, company: Option<String> },
    SmartRecruiters { slug: String, company: Option<String> },
    Workday { slug: String, site: Option<String>, company: Option<String> },
    RemoteOk,
    Himalayas,
    WeWorkRemotely { url: Option<String> },
    RssFeed { name: String, url: String },
    JsonFeed { name: String, url: String },
    Careers { company: String, url: String, location: Option<String> },
}

impl SourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::Greenhouse { .. } => "greenhouse",
            SourceSpec::Lever { .. } => "lever",
            SourceSpec::SmartRecruiters { .. } => "smartrecruiters",
            SourceSpec::Workday { .. } => "workday",
            SourceSpec::RemoteOk => "remoteok",
            SourceSpec::Himalayas => "himalayas",
            SourceSpec::WeWorkRemotely { .. } => "weworkremotely",
            SourceSpec::RssFeed { .. } => "rss",
            SourceSpec::JsonFeed { .. } => "json",
            SourceSpec::Careers { .. } => "careers",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub spec: SourceSpec,
    pub fetch: FetchSettings,
}

/// The full source list plus run-wide knobs.
///
/// Loading is deliberately forgiving: entries that cannot be understood
/// are skipped with a warning, and missing knobs fall back to defaults.
/// Only a file that fails to parse as JSON at all is fatal.
#[derive(Debug, Clone, Default)]
pub struct SourcesConfig {
    pub sources: Vec<SourceEntry>,
    pub days_back: Option<u32>,
    pub remote_overrides: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    rate_limit_secs: Option<u64>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    max_attempts: Option<u32>,
    #[serde(default)]
    days_back: Option<u32>,
    #[serde(default)]
    remote_overrides: Vec<String>,
    #[serde(default)]
    sources: Vec<Value>,
}

impl SourcesConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScrapeError> {
        let raw: RawConfig = serde_json::from_str(raw)
            .map_err(|e| ScrapeError::Config(format!("source list is not valid JSON: {e}")))?;

        let defaults = FetchSettings {
            rate_limit_secs: raw.rate_limit_secs.unwrap_or(DEFAULT_RATE_LIMIT_SECS),
            timeout_secs: raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_attempts: raw.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
        };

        let mut sources = Vec::with_capacity(raw.sources.len());
        for value in &raw.sources {
            if let Some(entry) = parse_entry(value, defaults) {
                sources.push(entry);
            }
        }
        if sources.is_empty() {
            tracing::warn!("No usable source entries, the run will produce no jobs");
        }

        Ok(Self {
            sources,
            days_back: Some(raw.days_back.unwrap_or(DEFAULT_DAYS_BACK)).filter(|d| *d > 0),
            remote_overrides: raw.remote_overrides,
        })
    }
}

fn parse_entry(value: &Value, defaults: FetchSettings) -> Option<SourceEntry> {
    let Some(kind) = value.get("kind").and_then(Value::as_str) else {
        tracing::warn!("Skipping source entry without a \"kind\" field");
        return None;
    };

    let spec = match kind.to_lowercase().as_str() {
        "greenhouse" => SourceSpec::Greenhouse {
            slug: required(value, "slug", kind)?,
            company: optional(value, "name"),
        },
        "lever" => SourceSpec::Lever {
            slug: required(value, "slug", kind)?,
            company: optional(value, "name"),
        },
        "smartrecruiters" => SourceSpec::SmartRecruiters {
            slug: required(value, "slug", kind)?,
            company: optional(value, "name"),
        },
        "workday" => SourceSpec::Workday {
            slug: required(value, "slug", kind)?,
            site: optional(value, "site"),
            company: optional(value, "name"),
        },
        "remoteok" => SourceSpec::RemoteOk,
        "himalayas" => SourceSpec::Himalayas,
        "weworkremotely" => SourceSpec::WeWorkRemotely {
            url: optional(value, "url"),
        },
        "rss" => SourceSpec::RssFeed {
            name: required(value, "name", kind)?,
            url: required(value, "url", kind)?,
        },
        "json" => SourceSpec::JsonFeed {
            name: required(value, "name", kind)?,
            url: required(value, "url", kind)?,
        },
        "careers" => SourceSpec::Careers {
            company: required(value, "name", kind)?,
            url: required(value, "url", kind)?,
            location: optional(value, "location"),
        },
        other => {
            tracing::warn!(kind = %other, "Skipping source entry with unknown kind");
            return None;
        }
    };

    let fetch = FetchSettings {
        rate_limit_secs: value
            .get("rate_limit_secs")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.rate_limit_secs),
        timeout_secs: value
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.timeout_secs),
        max_attempts: value
            .get("max_attempts")
            .and_then(Value::as_u64)
            .map(|v| (v as u32).max(1))
            .unwrap_or(defaults.max_attempts),
    };

    Some(SourceEntry { spec, fetch })
}

fn required(value: &Value, key: &str, kind: &str) -> Option<String> {
    match value.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => {
            tracing::warn!(%kind, field = %key, "Skipping source entry with missing field");
            None
        }
    }
}

fn optional(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
