pub mod config;
pub mod dataset;
pub mod error;
pub mod harvest;
pub mod registry;
pub mod session;
pub mod token;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use config::RunConfig;
pub use dataset::DatasetWriter;
pub use error::HarvestError;
pub use harvest::{Harvester, RunReport, SourceReport, SourceRole};
pub use registry::DedupRegistry;
pub use session::{SessionOutcome, SessionPager, Termination};
pub use token::{Sample, compute_hash, extract_samples};
pub use traits::{Feed, MessageBlock};
