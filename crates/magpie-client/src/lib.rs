pub mod clean;
pub mod fetch;

pub use clean::DescriptionCleaner;
pub use fetch::{FetchClient, FetchClientBuilder};
