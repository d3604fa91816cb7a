mod json;
mod rss;

pub mod boards;
pub mod careers;
pub mod factory;
pub mod feed;
pub mod greenhouse;
pub mod lever;
pub mod smartrecruiters;
pub mod workday;

pub use boards::{HimalayasAdapter, RemoteOkAdapter, WeWorkRemotelyAdapter};
pub use careers::CareerPageAdapter;
pub use factory::{AtsKind, build_adapters};
pub use feed::{FeedAdapter, FeedFormat};
pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;
pub use smartrecruiters::SmartRecruitersAdapter;
pub use workday::WorkdayAdapter;
