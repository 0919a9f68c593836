use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use driftnet_core::error::HarvestError;
use driftnet_core::traits::{Feed, MessageBlock};
use futures::StreamExt;

/// CSS selector for Telegram public-channel preview message bodies, the
/// stock deployment's feed format.
pub const DEFAULT_BLOCK_SELECTOR: &str = ".tgme_widget_message_text";

/// Rendering collaborator backed by headless Chromium via the Chrome
/// DevTools Protocol.
///
/// One Chromium process and one long-lived tab are shared across all clones;
/// the harvest pipeline navigates that single tab from source to source.
/// Block retrieval is a single JS evaluation over the configured selector,
/// and scrolling is a `window.scrollTo` to the document bottom.
#[derive(Clone)]
pub struct ChromiumFeed {
    /// Held to keep the Chromium process alive for the lifetime of the feed.
    _browser: Arc<Browser>,
    page: Page,
    selector: String,
    timeout: Duration,
}

/// Shape returned by the in-page block collection script. A block the page
/// failed to serialize comes back as `null`.
#[derive(serde::Deserialize)]
struct RawBlock {
    raw_markup: String,
    text: String,
}

impl ChromiumFeed {
    /// Launch headless Chromium with a **30 s** navigation timeout and the
    /// stock Telegram block selector.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`).
    pub async fn new() -> Result<Self, HarvestError> {
        Self::with_options(DEFAULT_BLOCK_SELECTOR, Duration::from_secs(30)).await
    }

    /// Launch with a custom block selector and navigation timeout.
    pub async fn with_options(selector: &str, timeout: Duration) -> Result<Self, HarvestError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags (--headless, --disable-gpu, …).  We try to
        // locate the *real* binary buried inside the snap, falling back
        // to any other Chrome/Chromium the user may have installed.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| HarvestError::Browser(format!("browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to open page: {e}")))?;

        Ok(Self {
            _browser: Arc::new(browser),
            page,
            selector: selector.to_string(),
            timeout,
        })
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// Looks inside the snap first (the `/snap/bin/chromium` wrapper strips
    /// unknown CLI flags, breaking headless mode), then falls back to
    /// well-known system paths.  If nothing is found we return `None` and
    /// let `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            // Snap (Ubuntu default)
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            // Flatpak
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            // Common apt / manual installs
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        // Also honour an explicit override via env var.
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

/// In-page script collecting every visible block for the selector.
/// Blocks the page cannot serialize come back as `null` and are skipped.
fn collect_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_default();
    format!(
        "Array.from(document.querySelectorAll({selector})).map((el) => {{ \
             try {{ return {{ raw_markup: el.outerHTML, text: el.innerText || '' }}; }} \
             catch (e) {{ return null; }} \
         }})"
    )
}

impl Feed for ChromiumFeed {
    async fn navigate(&self, url: &str) -> Result<(), HarvestError> {
        let result = tokio::time::timeout(self.timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| HarvestError::Browser(format!("failed to navigate to {url}: {e}")))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| HarvestError::Browser(format!("page did not settle: {e}")))?;
            Ok(())
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(HarvestError::Browser(format!(
                "navigation to {url} timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    async fn message_blocks(&self) -> Result<Vec<MessageBlock>, HarvestError> {
        let raw: Vec<Option<RawBlock>> = self
            .page
            .evaluate(collect_script(&self.selector))
            .await
            .map_err(|e| HarvestError::Browser(format!("block collection failed: {e}")))?
            .into_value()
            .map_err(|e| HarvestError::Browser(format!("unexpected block payload: {e}")))?;

        let total = raw.len();
        let blocks: Vec<MessageBlock> = raw
            .into_iter()
            .flatten()
            .map(|b| MessageBlock {
                raw_markup: b.raw_markup,
                text: b.text,
            })
            .collect();
        if blocks.len() < total {
            tracing::debug!(
                skipped = total - blocks.len(),
                "skipped unreadable message blocks"
            );
        }
        Ok(blocks)
    }

    async fn scroll_to_bottom(&self) -> Result<(), HarvestError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|e| HarvestError::Browser(format!("scroll failed: {e}")))?;
        Ok(())
    }
}
