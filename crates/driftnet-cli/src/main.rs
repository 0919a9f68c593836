use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use driftnet_browser::{ChromiumFeed, DEFAULT_BLOCK_SELECTOR};
use driftnet_core::config::source_label;
use driftnet_core::harvest::{Harvester, RunReport};
use driftnet_core::session::Termination;
use driftnet_core::RunConfig;

#[derive(Parser)]
#[command(
    name = "driftnet",
    version,
    about = "Harvests protocol connection descriptors from infinite-scroll feeds"
)]
struct Cli {
    /// Primary feed source URL (harvested with its own budget)
    #[arg(long, env = "DRIFTNET_PRIMARY_SOURCE")]
    primary_source: String,

    /// Sample budget for the primary source
    #[arg(long, default_value_t = 900)]
    primary_samples: usize,

    /// Secondary feed source URL; repeat the flag, order matters
    #[arg(long = "secondary-source")]
    secondary_sources: Vec<String>,

    /// Shared sample budget across all secondary sources
    #[arg(long, default_value_t = 99)]
    secondary_samples: usize,

    /// Directory for the registry and dataset files
    #[arg(long, default_value = "output", env = "DRIFTNET_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Retention cap per dataset file (last-N lines kept)
    #[arg(long, default_value_t = 999)]
    max_entries: usize,

    /// Hard ceiling on scroll steps per source
    #[arg(long, default_value_t = 500)]
    max_scroll_steps: u32,

    /// Settle delay after navigation and after each scroll, in milliseconds
    #[arg(long, default_value_t = 1000)]
    settle_delay_ms: u64,

    /// Scroll steps without a new block before a source is declared stable
    #[arg(long, default_value_t = 5)]
    stagnation_threshold: u32,

    /// CSS selector for message blocks in the rendered feed
    #[arg(long, default_value = DEFAULT_BLOCK_SELECTOR)]
    block_selector: String,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 30)]
    nav_timeout_secs: u64,

    /// Print the run report as JSON instead of a text summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("driftnet=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = RunConfig::new(&cli.primary_source);
    config.primary_sample_count = cli.primary_samples;
    config.secondary_sources = cli.secondary_sources;
    config.secondary_sample_count = cli.secondary_samples;
    config.output_dir = cli.output_dir;
    config.max_entries_per_dataset = cli.max_entries;
    config.max_scroll_steps = cli.max_scroll_steps;
    config.settle_delay = Duration::from_millis(cli.settle_delay_ms);
    config.stagnation_threshold = cli.stagnation_threshold;
    config.validate().context("invalid run parameters")?;

    tracing::info!(
        primary = source_label(&config.primary_source),
        secondaries = config.secondary_sources.len(),
        "starting harvest run"
    );

    let feed = ChromiumFeed::with_options(
        &cli.block_selector,
        Duration::from_secs(cli.nav_timeout_secs),
    )
    .await
    .context("failed to start the rendering session")?;

    let report = Harvester::new(feed, config)
        .run()
        .await
        .context("harvest run failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    for source in &report.sources {
        println!(
            "  [{:?}] {} — {} accepted in {} steps, {} ({:.1}s)",
            source.role,
            source_label(&source.url),
            source.accepted,
            source.steps,
            describe(&source.termination),
            source.elapsed.as_secs_f64(),
        );
    }
    println!(
        "\nTotal: {} new samples across {} sources in {:.1}s",
        report.accepted_total,
        report.sources.len(),
        report.elapsed.as_secs_f64(),
    );
    if report.accepted_total == 0 {
        println!("No new samples identified in this collection cycle.");
    }
}

fn describe(termination: &Termination) -> String {
    match termination {
        Termination::GoalReached => "goal reached".into(),
        Termination::SourceStable => "source drained".into(),
        Termination::StepCapExceeded => "step cap reached".into(),
        Termination::SourceUnavailable(message) => format!("source unavailable: {message}"),
    }
}
