//! Test utilities: a scripted mock of the rendering collaborator.
//!
//! Handwritten mock behind `Arc<Mutex<_>>`: a feed is described as a
//! sequence of page snapshots, one per scroll position, and calls are
//! recorded for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::HarvestError;
use crate::traits::{Feed, MessageBlock};

/// Build a message block whose markup embeds its text, so distinct texts
/// get distinct structural fingerprints.
pub fn block(text: &str) -> MessageBlock {
    MessageBlock {
        raw_markup: format!("<div class=\"tgme_widget_message_text\">{text}</div>"),
        text: text.to_string(),
    }
}

struct MockFeedState {
    /// Snapshot sequences per source URL. Index = scrolls performed so far;
    /// past the end the last snapshot repeats (the feed has drained).
    sources: HashMap<String, Vec<Vec<MessageBlock>>>,
    current: Vec<Vec<MessageBlock>>,
    cursor: usize,
    navigated: Vec<String>,
    navigate_errors: HashMap<String, String>,
    /// Number of successful `message_blocks` calls left before failing.
    blocks_budget: Option<usize>,
}

/// Scripted infinite-scroll feed for tests.
#[derive(Clone)]
pub struct MockFeed {
    inner: Arc<Mutex<MockFeedState>>,
}

impl MockFeed {
    pub fn new(sources: HashMap<String, Vec<Vec<MessageBlock>>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockFeedState {
                sources,
                current: Vec::new(),
                cursor: 0,
                navigated: Vec::new(),
                navigate_errors: HashMap::new(),
                blocks_budget: None,
            })),
        }
    }

    /// Feed with one known source.
    pub fn single_source(url: &str, snapshots: Vec<Vec<MessageBlock>>) -> Self {
        Self::new(HashMap::from([(url.to_string(), snapshots)]))
    }

    /// Register another source and its snapshots.
    pub fn add_source(self, url: &str, snapshots: Vec<Vec<MessageBlock>>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .sources
            .insert(url.to_string(), snapshots);
        self
    }

    /// Make navigation to `url` fail with the given message.
    pub fn with_navigate_error(self, url: &str, message: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .navigate_errors
            .insert(url.to_string(), message.to_string());
        self
    }

    /// Let `calls` block retrievals succeed, then fail every later one.
    pub fn fail_blocks_after(self, calls: usize) -> Self {
        self.inner.lock().unwrap().blocks_budget = Some(calls);
        self
    }

    /// URLs navigated to, in order.
    pub fn navigated(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigated.clone()
    }
}

impl Feed for MockFeed {
    async fn navigate(&self, url: &str) -> Result<(), HarvestError> {
        let mut state = self.inner.lock().unwrap();
        state.navigated.push(url.to_string());
        if let Some(message) = state.navigate_errors.get(url) {
            return Err(HarvestError::Browser(message.clone()));
        }
        state.current = state.sources.get(url).cloned().unwrap_or_default();
        state.cursor = 0;
        Ok(())
    }

    async fn message_blocks(&self) -> Result<Vec<MessageBlock>, HarvestError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(budget) = state.blocks_budget.as_mut() {
            if *budget == 0 {
                return Err(HarvestError::Browser("render session lost".into()));
            }
            *budget -= 1;
        }
        if state.current.is_empty() {
            return Ok(Vec::new());
        }
        let index = state.cursor.min(state.current.len() - 1);
        Ok(state.current[index].clone())
    }

    async fn scroll_to_bottom(&self) -> Result<(), HarvestError> {
        self.inner.lock().unwrap().cursor += 1;
        Ok(())
    }
}
