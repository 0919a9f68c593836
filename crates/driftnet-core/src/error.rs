use thiserror::Error;

/// Application-wide error types for driftnet.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The rendering session failed (navigation, block retrieval, scrolling).
    ///
    /// Recoverable per source: the session pager turns this into a
    /// `SourceUnavailable` outcome and the run moves on to the next source.
    #[error("browser error: {0}")]
    Browser(String),

    /// Registry or dataset file could not be read or written.
    ///
    /// Fatal for the run: if the registry cannot be persisted, the next run
    /// would re-emit duplicates.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Invalid run parameters (bad source URL, zero-sized caps).
    #[error("config error: {0}")]
    Config(String),
}

impl HarvestError {
    /// True if the run must stop rather than continue with the next source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarvestError::Persistence(_) | HarvestError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_errors_are_recoverable() {
        assert!(!HarvestError::Browser("tab crashed".into()).is_fatal());
    }

    #[test]
    fn persistence_and_config_errors_are_fatal() {
        assert!(HarvestError::Persistence("disk full".into()).is_fatal());
        assert!(HarvestError::Config("bad url".into()).is_fatal());
    }
}
