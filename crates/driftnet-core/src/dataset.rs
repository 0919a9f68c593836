use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{AGGREGATE_DATASET, protocol_dataset_name};
use crate::error::HarvestError;
use crate::token::Sample;

/// Appends accepted samples to rolling dataset files and enforces the
/// retention cap.
///
/// Each run appends to the aggregate dataset plus one file per protocol tag
/// present in the run, then trims every touched file to its last
/// `max_entries` lines. The trim is a pure suffix retention — a hard cap on
/// disk usage, oldest lines physically discarded. The dedup registry is
/// never trimmed, so rotated-away samples still cannot be re-emitted.
pub struct DatasetWriter {
    dir: PathBuf,
    max_entries: usize,
}

impl DatasetWriter {
    /// Create a writer rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, max_entries: usize) -> Result<Self, HarvestError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            HarvestError::Persistence(format!("create output dir {}: {e}", dir.display()))
        })?;
        Ok(Self { dir, max_entries })
    }

    /// Persist one run's accepted samples: aggregate file first, then one
    /// file per protocol tag, each trimmed to the cap.
    pub fn write_run(&self, samples: &[Sample]) -> Result<(), HarvestError> {
        if samples.is_empty() {
            return Ok(());
        }

        self.append_and_trim(
            AGGREGATE_DATASET,
            samples.iter().map(|sample| sample.text.as_str()),
        )?;

        let mut by_tag: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for sample in samples {
            by_tag
                .entry(sample.protocol.as_str())
                .or_default()
                .push(sample.text.as_str());
        }
        for (tag, lines) in by_tag {
            self.append_and_trim(&protocol_dataset_name(tag), lines.into_iter())?;
        }

        Ok(())
    }

    fn append_and_trim<'a>(
        &self,
        file_name: &str,
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<(), HarvestError> {
        let path = self.dir.join(file_name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                HarvestError::Persistence(format!("open dataset {}: {e}", path.display()))
            })?;
        for line in lines {
            writeln!(file, "{line}").map_err(|e| {
                HarvestError::Persistence(format!("append dataset {}: {e}", path.display()))
            })?;
        }
        drop(file);
        trim_to_last(&path, self.max_entries)
    }
}

/// Keep only the last `max_entries` non-empty lines of `path`, in order.
fn trim_to_last(path: &Path, max_entries: usize) -> Result<(), HarvestError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| HarvestError::Persistence(format!("read dataset {}: {e}", path.display())))?;
    let entries: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if entries.len() <= max_entries {
        return Ok(());
    }
    let kept = &entries[entries.len() - max_entries..];
    fs::write(path, format!("{}\n", kept.join("\n"))).map_err(|e| {
        HarvestError::Persistence(format!("rewrite dataset {}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn sample(token: &str) -> Sample {
        Sample::from_token(token)
    }

    #[test]
    fn writes_aggregate_and_per_tag_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path(), 100).unwrap();

        writer
            .write_run(&[
                sample("vless://one"),
                sample("trojan://two"),
                sample("vless://three"),
            ])
            .unwrap();

        assert_eq!(
            read_lines(&dir.path().join("all_samples.txt")),
            vec!["vless://one", "trojan://two", "vless://three"]
        );
        assert_eq!(
            read_lines(&dir.path().join("vless_samples.txt")),
            vec!["vless://one", "vless://three"]
        );
        assert_eq!(
            read_lines(&dir.path().join("trojan_samples.txt")),
            vec!["trojan://two"]
        );
    }

    #[test]
    fn trim_keeps_exactly_the_last_n_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path(), 3).unwrap();

        let samples: Vec<Sample> = (0..5).map(|i| sample(&format!("ss://cfg{i}"))).collect();
        writer.write_run(&samples).unwrap();

        assert_eq!(
            read_lines(&dir.path().join("all_samples.txt")),
            vec!["ss://cfg2", "ss://cfg3", "ss://cfg4"]
        );
    }

    #[test]
    fn trim_applies_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path(), 4).unwrap();

        writer
            .write_run(&[sample("tuic://a"), sample("tuic://b"), sample("tuic://c")])
            .unwrap();
        writer
            .write_run(&[sample("tuic://d"), sample("tuic://e")])
            .unwrap();

        assert_eq!(
            read_lines(&dir.path().join("tuic_samples.txt")),
            vec!["tuic://b", "tuic://c", "tuic://d", "tuic://e"]
        );
    }

    #[test]
    fn empty_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path(), 10).unwrap();
        writer.write_run(&[]).unwrap();
        assert!(!dir.path().join("all_samples.txt").exists());
    }

    #[test]
    fn file_below_cap_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path(), 10).unwrap();
        writer
            .write_run(&[sample("hysteria://x"), sample("hysteria://y")])
            .unwrap();
        assert_eq!(
            read_lines(&dir.path().join("hysteria_samples.txt")),
            vec!["hysteria://x", "hysteria://y"]
        );
    }
}
