use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::HarvestError;

/// File name of the durable content-hash registry inside the output dir.
pub const REGISTRY_FILE: &str = "processed_samples.txt";

/// File name of the aggregate dataset inside the output dir.
pub const AGGREGATE_DATASET: &str = "all_samples.txt";

/// Parameters for one harvest run.
///
/// One config drives the whole pipeline; a run without secondary sources is
/// just the empty-list case, not a separate code path.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Primary feed source; harvested with its own budget, always attempted.
    pub primary_source: String,
    /// Sample budget for the primary source.
    pub primary_sample_count: usize,
    /// Secondary feed sources, visited in order.
    pub secondary_sources: Vec<String>,
    /// Shared budget pool across all secondary sources.
    pub secondary_sample_count: usize,
    /// Directory holding the registry and dataset files.
    pub output_dir: PathBuf,
    /// Retention cap per dataset file (last-N lines kept).
    pub max_entries_per_dataset: usize,
    /// Hard ceiling on scroll steps per session.
    pub max_scroll_steps: u32,
    /// Fixed wait after navigation and after each scroll command.
    pub settle_delay: Duration,
    /// Steps without a newly-seen block before a source is declared stable.
    pub stagnation_threshold: u32,
}

impl RunConfig {
    /// Config with the stock deployment numbers for everything but the
    /// primary source URL.
    pub fn new(primary_source: impl Into<String>) -> Self {
        Self {
            primary_source: primary_source.into(),
            primary_sample_count: 900,
            secondary_sources: Vec::new(),
            secondary_sample_count: 99,
            output_dir: PathBuf::from("output"),
            max_entries_per_dataset: 999,
            max_scroll_steps: 500,
            settle_delay: Duration::from_secs(1),
            stagnation_threshold: 5,
        }
    }

    /// Check every source URL parses and the caps are usable.
    pub fn validate(&self) -> Result<(), HarvestError> {
        validate_source(&self.primary_source)?;
        for source in &self.secondary_sources {
            validate_source(source)?;
        }
        if self.max_entries_per_dataset == 0 {
            return Err(HarvestError::Config(
                "max_entries_per_dataset must be at least 1".into(),
            ));
        }
        if self.max_scroll_steps == 0 {
            return Err(HarvestError::Config("max_scroll_steps must be at least 1".into()));
        }
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.output_dir.join(REGISTRY_FILE)
    }

    pub fn aggregate_dataset_path(&self) -> PathBuf {
        self.output_dir.join(AGGREGATE_DATASET)
    }

    /// Path of the dataset for one protocol tag.
    pub fn protocol_dataset_path(&self, tag: &str) -> PathBuf {
        self.output_dir.join(protocol_dataset_name(tag))
    }
}

/// Deterministic dataset file name for a protocol tag.
pub fn protocol_dataset_name(tag: &str) -> String {
    format!("{tag}_samples.txt")
}

fn validate_source(source: &str) -> Result<(), HarvestError> {
    let parsed = Url::parse(source)
        .map_err(|e| HarvestError::Config(format!("invalid source URL '{source}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(HarvestError::Config(format!(
            "source '{source}' has scheme '{scheme}', expected http or https"
        ))),
    }
}

/// Derive a short label for a source URL, for logs and reports.
///
/// Example: `"https://t.me/s/ConfigsHUB"` → `"ConfigsHUB"`
pub fn source_label(source: &str) -> &str {
    source
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(source)
}
