use std::future::Future;

use crate::error::HarvestError;

/// One unit of rendered feed content, as currently visible in the session.
///
/// Blocks carry no stable server-side id; within a session they are told
/// apart by a structural fingerprint over `raw_markup` (see `session`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    /// Raw serialized markup of the block.
    pub raw_markup: String,
    /// Visible text content. May be empty for media-only blocks.
    pub text: String,
}

/// Drives one navigable rendering session over an infinite-scroll feed.
///
/// The pipeline issues these calls; driver lifecycle, headless flags and
/// process shutdown belong to the implementor.
pub trait Feed: Send + Sync + Clone {
    /// Navigate the session to a feed URL.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), HarvestError>> + Send;

    /// Return every message block currently present in the rendered
    /// document, in document order. Infinite-scroll feeds only append; old
    /// blocks keep showing up here on every call.
    fn message_blocks(&self)
    -> impl Future<Output = Result<Vec<MessageBlock>, HarvestError>> + Send;

    /// Scroll the document to the bottom, prompting the feed to reveal
    /// older content.
    fn scroll_to_bottom(&self) -> impl Future<Output = Result<(), HarvestError>> + Send;
}
