pub mod feed;

pub use feed::{ChromiumFeed, DEFAULT_BLOCK_SELECTOR};
