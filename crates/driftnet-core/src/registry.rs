use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::HarvestError;
use crate::token::compute_hash;

/// Durable content-hash registry: the cross-run, cross-source dedup set.
///
/// Loaded once at the start of a run and flushed once at the end. The
/// backing file is append-only; hashes are never rewritten or trimmed, so
/// registry growth is monotonic for the lifetime of the deployment — even
/// when the corresponding dataset line is later rotated away.
pub struct DedupRegistry {
    path: PathBuf,
    seen: HashSet<String>,
    staged: Vec<String>,
}

impl DedupRegistry {
    /// Load the registry file at `path`. A missing file is an empty
    /// registry, not an error; any other I/O failure is fatal.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(HarvestError::Persistence(format!(
                    "read registry {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            seen,
            staged: Vec::new(),
        })
    }

    /// Decide whether a token is new. Returns `false` for a duplicate;
    /// otherwise records the hash in memory, stages it for the next
    /// [`flush`](Self::flush), and returns `true`.
    pub fn accept(&mut self, token: &str) -> bool {
        let hash = compute_hash(token);
        if self.seen.contains(&hash) {
            return false;
        }
        self.seen.insert(hash.clone());
        self.staged.push(hash);
        true
    }

    /// True if the token's hash is already registered.
    pub fn contains(&self, token: &str) -> bool {
        self.seen.contains(&compute_hash(token))
    }

    /// Number of hashes known in memory (loaded + staged).
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Append all staged hashes to the registry file, one per line, in
    /// acceptance order. Returns how many were written.
    pub fn flush(&mut self) -> Result<usize, HarvestError> {
        if self.staged.is_empty() {
            return Ok(0);
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                HarvestError::Persistence(format!("open registry {}: {e}", self.path.display()))
            })?;
        for hash in &self.staged {
            writeln!(file, "{hash}").map_err(|e| {
                HarvestError::Persistence(format!("append registry {}: {e}", self.path.display()))
            })?;
        }
        let flushed = self.staged.len();
        self.staged.clear();
        Ok(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DedupRegistry::load(dir.path().join("registry.txt")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn accept_rejects_second_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = DedupRegistry::load(dir.path().join("registry.txt")).unwrap();

        assert!(!registry.contains("vless://abc"));
        assert!(registry.accept("vless://abc"));
        assert!(registry.contains("vless://abc"));
        assert!(!registry.accept("vless://abc"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn flush_appends_without_touching_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.txt");
        fs::write(&path, "preexisting-hash\n").unwrap();

        let mut registry = DedupRegistry::load(&path).unwrap();
        assert!(registry.accept("vmess://new"));
        assert_eq!(registry.flush().unwrap(), 1);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "preexisting-hash");
        assert_eq!(lines[1], compute_hash("vmess://new"));
    }

    #[test]
    fn flush_is_a_noop_with_nothing_staged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.txt");
        let mut registry = DedupRegistry::load(&path).unwrap();
        assert_eq!(registry.flush().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn reload_sees_flushed_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.txt");

        let mut registry = DedupRegistry::load(&path).unwrap();
        assert!(registry.accept("trojan://once"));
        registry.flush().unwrap();

        let mut reloaded = DedupRegistry::load(&path).unwrap();
        assert!(!reloaded.accept("trojan://once"));
    }

    #[test]
    fn staged_hashes_flush_in_acceptance_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.txt");

        let mut registry = DedupRegistry::load(&path).unwrap();
        registry.accept("ss://first");
        registry.accept("ss://second");
        registry.flush().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<String> = contents.lines().map(str::to_string).collect();
        assert_eq!(
            lines,
            vec![compute_hash("ss://first"), compute_hash("ss://second")]
        );
    }
}
