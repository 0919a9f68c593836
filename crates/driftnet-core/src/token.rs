use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Connection-descriptor pattern: a known scheme followed by `://` and a
/// run of non-whitespace. The scheme matches case-insensitively; the token
/// is returned exactly as written.
static PROTOCOL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:vless|vmess|trojan|ssr|ss|tuic|hysteria)://\S+")
        .expect("protocol pattern is a valid regex")
});

/// One extracted protocol token.
///
/// Two samples are the same iff the SHA-256 of their raw `text` is equal,
/// regardless of which source or protocol they came from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Sample {
    /// Lower-cased scheme prefix (e.g. "vless", "trojan").
    pub protocol: String,
    /// The matched token, original casing preserved.
    pub text: String,
}

impl Sample {
    /// Build a sample from a matched token, deriving the protocol tag.
    pub fn from_token(token: &str) -> Self {
        let protocol = token
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            protocol,
            text: token.to_string(),
        }
    }

    /// SHA-256 hex digest of the raw token text.
    pub fn content_hash(&self) -> String {
        compute_hash(&self.text)
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract all protocol tokens from a block of text, in match order.
///
/// No side effects; empty or non-matching input yields an empty vec.
pub fn extract_samples(text: &str) -> Vec<Sample> {
    PROTOCOL_PATTERN
        .find_iter(text)
        .map(|m| Sample::from_token(m.as_str()))
        .collect()
}
