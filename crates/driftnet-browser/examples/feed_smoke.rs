/// Smoke-test for `ChromiumFeed`.
///
/// Launches a headless Chromium, navigates to a public Telegram channel
/// preview, and prints how many message blocks are visible before and after
/// one scroll.
///
/// Run with:
///   cargo run --example feed_smoke -- https://t.me/s/telegram
use std::time::Duration;

use driftnet_browser::ChromiumFeed;
use driftnet_core::traits::Feed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://t.me/s/telegram".to_string());

    println!("Launching headless browser…");
    let feed = ChromiumFeed::new().await?;

    println!("Navigating to {url} …");
    feed.navigate(&url).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let before = feed.message_blocks().await?;
    println!("{} blocks visible", before.len());

    feed.scroll_to_bottom().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let after = feed.message_blocks().await?;
    println!("{} blocks visible after one scroll", after.len());

    if let Some(block) = after.first() {
        let preview: String = block.text.chars().take(120).collect();
        println!("First block text:\n{preview}");
    }
    Ok(())
}
