pub mod config;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod recency;
pub mod record;
pub mod remote;
pub mod salary;
pub mod testutil;
pub mod traits;

pub use config::{SourceEntry, SourceSpec, SourcesConfig};
pub use dedup::Deduplicator;
pub use domain::{Domain, DomainClassifier};
pub use error::ScrapeError;
pub use pipeline::{Pipeline, RunOutcome, RunReport};
pub use record::JobPosting;
pub use remote::{RemoteClassifier, RemoteRules};
pub use traits::{Fetch, Payload, SourceAdapter};
