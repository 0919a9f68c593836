use std::collections::HashSet;
use std::time::Duration;

use crate::config::RunConfig;
use crate::registry::DedupRegistry;
use crate::token::{Sample, extract_samples};
use crate::traits::Feed;

/// Length of the structural fingerprint taken from a block's raw markup.
///
/// Infinite-scroll feeds keep old blocks in the DOM and only append below,
/// so re-inspection has to be suppressed by content prefix, not position.
/// Fingerprints are session-scoped and never persisted.
pub const FINGERPRINT_LEN: usize = 400;

/// Why a session's pagination loop stopped. None of these are errors; even
/// `SourceUnavailable` carries whatever was accepted before the failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The session hit its target sample count.
    GoalReached,
    /// No newly-seen block past the warm-up window; feed is drained.
    SourceStable,
    /// Hard ceiling on scroll steps reached.
    StepCapExceeded,
    /// Navigation or block retrieval failed; session aborted, tokens kept.
    SourceUnavailable(String),
}

/// Result of one session against one source.
#[derive(Debug)]
pub struct SessionOutcome {
    pub accepted: Vec<Sample>,
    pub steps: u32,
    pub termination: Termination,
}

/// Per-source harvesting state machine.
///
/// Repeatedly reads the visible message blocks, skips blocks already seen
/// this session (by structural fingerprint), extracts protocol tokens from
/// the rest, checks each against the durable registry, and scrolls for
/// more — until the target count is reached, the feed stops producing new
/// blocks, or the step cap is hit.
pub struct SessionPager<'a, F: Feed> {
    feed: &'a F,
    settle_delay: Duration,
    max_scroll_steps: u32,
    stagnation_threshold: u32,
}

impl<'a, F: Feed> SessionPager<'a, F> {
    pub fn new(feed: &'a F, config: &RunConfig) -> Self {
        Self {
            feed,
            settle_delay: config.settle_delay,
            max_scroll_steps: config.max_scroll_steps,
            stagnation_threshold: config.stagnation_threshold,
        }
    }

    /// Run one session: navigate to `url` and page until done.
    ///
    /// Newly accepted tokens are recorded in `registry` as a side effect;
    /// the returned outcome lists them in acceptance order.
    pub async fn run(
        &self,
        url: &str,
        target: usize,
        registry: &mut DedupRegistry,
    ) -> SessionOutcome {
        if target == 0 {
            return SessionOutcome {
                accepted: Vec::new(),
                steps: 0,
                termination: Termination::GoalReached,
            };
        }

        tracing::info!(url, goal = target, "starting session");

        if let Err(e) = self.feed.navigate(url).await {
            tracing::warn!(url, error = %e, "source unavailable, skipping");
            return SessionOutcome {
                accepted: Vec::new(),
                steps: 0,
                termination: Termination::SourceUnavailable(e.to_string()),
            };
        }
        tokio::time::sleep(self.settle_delay).await;

        let mut fingerprints: HashSet<String> = HashSet::new();
        let mut accepted: Vec<Sample> = Vec::new();
        let mut steps: u32 = 0;

        while steps < self.max_scroll_steps {
            let blocks = match self.feed.message_blocks().await {
                Ok(blocks) => blocks,
                Err(e) => {
                    tracing::warn!(url, error = %e, "block retrieval failed, aborting session");
                    return SessionOutcome {
                        accepted,
                        steps,
                        termination: Termination::SourceUnavailable(e.to_string()),
                    };
                }
            };

            let mut new_block_seen = false;
            for block in &blocks {
                if !fingerprints.insert(fingerprint(&block.raw_markup)) {
                    continue;
                }
                new_block_seen = true;

                let text = block.text.trim();
                if text.is_empty() {
                    continue;
                }

                for sample in extract_samples(text) {
                    if !registry.accept(&sample.text) {
                        continue;
                    }
                    accepted.push(sample);
                    if accepted.len() >= target {
                        tracing::info!(url, accepted = accepted.len(), "target reached");
                        return SessionOutcome {
                            accepted,
                            steps,
                            termination: Termination::GoalReached,
                        };
                    }
                }
            }

            if !new_block_seen && steps > self.stagnation_threshold {
                tracing::info!(url, accepted = accepted.len(), "no new blocks, source stable");
                return SessionOutcome {
                    accepted,
                    steps,
                    termination: Termination::SourceStable,
                };
            }

            if let Err(e) = self.feed.scroll_to_bottom().await {
                tracing::warn!(url, error = %e, "scroll failed, aborting session");
                return SessionOutcome {
                    accepted,
                    steps,
                    termination: Termination::SourceUnavailable(e.to_string()),
                };
            }
            tokio::time::sleep(self.settle_delay).await;
            steps += 1;

            if steps % 10 == 0 {
                tracing::info!(url, steps, accepted = accepted.len(), "still paging");
            }
        }

        tracing::info!(url, steps, accepted = accepted.len(), "scroll step cap reached");
        SessionOutcome {
            accepted,
            steps,
            termination: Termination::StepCapExceeded,
        }
    }
}

/// Structural fingerprint of a rendered block: a fixed-length prefix of its
/// raw markup.
fn fingerprint(raw_markup: &str) -> String {
    raw_markup.chars().take(FINGERPRINT_LEN).collect()
}
