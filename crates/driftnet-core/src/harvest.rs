use std::time::{Duration, Instant};

use crate::config::RunConfig;
use crate::dataset::DatasetWriter;
use crate::error::HarvestError;
use crate::registry::DedupRegistry;
use crate::session::{SessionOutcome, SessionPager, Termination};
use crate::token::Sample;
use crate::traits::Feed;

/// Whether a source ran on its own budget or the shared secondary pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    Primary,
    Secondary,
}

/// Per-source outcome of a run.
#[derive(Debug, serde::Serialize)]
pub struct SourceReport {
    pub url: String,
    pub role: SourceRole,
    pub accepted: usize,
    pub steps: u32,
    pub termination: Termination,
    pub elapsed: Duration,
}

/// Summary of one full harvest run. Zero newly-accepted samples is a
/// normal outcome, not an error.
#[derive(Debug, serde::Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    /// Samples newly accepted and written this run.
    pub accepted_total: usize,
    /// Content hashes appended to the registry (equals `accepted_total`).
    pub registered: usize,
    pub elapsed: Duration,
}

/// The full harvest pipeline, parameterized by one [`RunConfig`].
///
/// Visits the primary source on its own budget, then drains the shared
/// secondary pool across the secondary sources in order, merges the
/// accepted samples into the rolling datasets, and flushes the registry.
/// Sources run strictly one after another; the rendering collaborator
/// exposes a single navigable session.
pub struct Harvester<F: Feed> {
    feed: F,
    config: RunConfig,
}

impl<F: Feed> Harvester<F> {
    pub fn new(feed: F, config: RunConfig) -> Self {
        Self { feed, config }
    }

    /// Execute one run. Collaborator failures abort only the affected
    /// source's session; persistence failures abort the run.
    pub async fn run(&self) -> Result<RunReport, HarvestError> {
        self.config.validate()?;

        let run_start = Instant::now();
        let mut registry = DedupRegistry::load(self.config.registry_path())?;
        tracing::info!(known_hashes = registry.len(), "registry loaded");

        let pager = SessionPager::new(&self.feed, &self.config);
        let mut accepted: Vec<Sample> = Vec::new();
        let mut sources: Vec<SourceReport> = Vec::new();

        // Primary source: independent budget, always attempted.
        let started = Instant::now();
        let outcome = pager
            .run(
                &self.config.primary_source,
                self.config.primary_sample_count,
                &mut registry,
            )
            .await;
        sources.push(source_report(
            &self.config.primary_source,
            SourceRole::Primary,
            &outcome,
            started.elapsed(),
        ));
        accepted.extend(outcome.accepted);

        // Secondary sources: one shared pool, consumed first-come in list
        // order, never replenished within the run.
        let mut pool_used = 0usize;
        for source in &self.config.secondary_sources {
            let remaining = self.config.secondary_sample_count.saturating_sub(pool_used);
            if remaining == 0 {
                tracing::info!("secondary budget exhausted, skipping remaining sources");
                break;
            }
            let started = Instant::now();
            let outcome = pager.run(source, remaining, &mut registry).await;
            pool_used += outcome.accepted.len();
            sources.push(source_report(
                source,
                SourceRole::Secondary,
                &outcome,
                started.elapsed(),
            ));
            accepted.extend(outcome.accepted);
        }

        if !accepted.is_empty() {
            let writer =
                DatasetWriter::new(&self.config.output_dir, self.config.max_entries_per_dataset)?;
            writer.write_run(&accepted)?;
        }
        let registered = registry.flush()?;

        let report = RunReport {
            sources,
            accepted_total: accepted.len(),
            registered,
            elapsed: run_start.elapsed(),
        };
        tracing::info!(
            accepted = report.accepted_total,
            sources = report.sources.len(),
            "run complete"
        );
        Ok(report)
    }
}

fn source_report(
    url: &str,
    role: SourceRole,
    outcome: &SessionOutcome,
    elapsed: Duration,
) -> SourceReport {
    SourceReport {
        url: url.to_string(),
        role,
        accepted: outcome.accepted.len(),
        steps: outcome.steps,
        termination: outcome.termination.clone(),
        elapsed,
    }
}
