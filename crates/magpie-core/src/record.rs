use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Domain;

/// Descriptions are clipped to keep records bounded; long postings repeat
/// themselves well before this point.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// One normalized job posting, regardless of which source produced it.
///
/// `apply_url` is the business key: two postings with the same `apply_url`
/// are the same job, whatever else differs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
    pub apply_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "remote")]
    pub is_remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<i64>,
    pub domain: Domain,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
}

impl JobPosting {
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        apply_url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            company: company.into(),
            description: String::new(),
            apply_url: apply_url.into(),
            location: None,
            is_remote: false,
            salary_min: None,
            salary_max: None,
            domain: Domain::Other,
            source: source.into(),
            source_job_id: None,
            posted_at: None,
            scraped_at: Utc::now(),
        }
    }

    /// Sets the description, clipped to [`MAX_DESCRIPTION_CHARS`].
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.chars().count() > MAX_DESCRIPTION_CHARS {
            description.chars().take(MAX_DESCRIPTION_CHARS).collect()
        } else {
            description
        };
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_remote(mut self, is_remote: bool) -> Self {
        self.is_remote = is_remote;
        self
    }

    /// Sets the salary range, swapping the bounds if they arrive reversed.
    pub fn with_salary(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        let (min, max) = match (min, max) {
            (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
            other => other,
        };
        self.salary_min = min;
        self.salary_max = max;
        self
    }

    pub fn with_source_job_id(mut self, id: impl Into<String>) -> Self {
        self.source_job_id = Some(id.into());
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }
}
