//! Configuration builders controlling training, corpus ingestion, and vocabulary output.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BpeError, Result};
use crate::table::is_word_separator;
use crate::vocab::VocabOrder;

/// Default start-of-word marker.
pub const DEFAULT_START_MARKER: &str = "<w>";
/// Default end-of-word marker.
pub const DEFAULT_END_MARKER: &str = "</w>";

/// How the training loop obtains pair counts for each round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountingStrategy {
    /// Count once, then fold the merger's pair deltas into the running counts.
    #[default]
    Incremental,
    /// Re-run the pair counter over the whole table every round.
    Recount,
}

/// Configuration for word-level BPE training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Merge round budget. Zero is valid and keeps the character-level inventory.
    pub num_merges: usize,
    /// Minimum pair count required before a pair is eligible for merging.
    pub min_frequency: u64,
    /// Symbol prepended to every word, if any.
    pub start_marker: Option<String>,
    /// Symbol appended to every word.
    pub end_marker: String,
    /// Glues the end marker onto the last character instead of emitting a separate symbol.
    pub attach_end_marker: bool,
    /// Pair counting strategy used by the training loop.
    pub counting: CountingStrategy,
    /// Enables per-round logging through the `log` facade.
    pub show_progress: bool,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        if self.end_marker.is_empty() {
            return Err(BpeError::InvalidConfig(
                "end_marker must not be empty".into(),
            ));
        }
        validate_marker("end_marker", &self.end_marker)?;
        if let Some(start) = &self.start_marker {
            if start.is_empty() {
                return Err(BpeError::InvalidConfig(
                    "start_marker must not be empty when set".into(),
                ));
            }
            validate_marker("start_marker", start)?;
            if *start == self.end_marker {
                return Err(BpeError::InvalidConfig(format!(
                    "start_marker and end_marker must differ (both are {start:?})"
                )));
            }
        }
        if self.min_frequency == 0 {
            return Err(BpeError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            num_merges: 100,
            min_frequency: 1,
            start_marker: Some(DEFAULT_START_MARKER.into()),
            end_marker: DEFAULT_END_MARKER.into(),
            attach_end_marker: false,
            counting: CountingStrategy::default(),
            show_progress: true,
        }
    }
}

fn validate_marker(name: &str, marker: &str) -> Result<()> {
    if marker.chars().any(is_word_separator) {
        return Err(BpeError::InvalidConfig(format!(
            "{name} ({marker:?}) must not contain whitespace"
        )));
    }
    Ok(())
}

/// Converts a caller-supplied signed merge count, rejecting negative values.
pub fn num_merges_from_signed(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        BpeError::InvalidConfig(format!("num_merges must be non-negative, got {value}"))
    })
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge round budget.
    #[must_use]
    pub fn num_merges(mut self, value: usize) -> Self {
        self.cfg.num_merges = value;
        self
    }

    /// Sets the minimum merge frequency.
    #[must_use]
    pub fn min_frequency(mut self, value: u64) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Sets or clears the start-of-word marker.
    #[must_use]
    pub fn start_marker<S: Into<String>>(mut self, marker: Option<S>) -> Self {
        self.cfg.start_marker = marker.map(Into::into);
        self
    }

    /// Sets the end-of-word marker.
    #[must_use]
    pub fn end_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.cfg.end_marker = marker.into();
        self
    }

    /// Glues the end marker to the final character of each word.
    #[must_use]
    pub fn attach_end_marker(mut self, enabled: bool) -> Self {
        self.cfg.attach_end_marker = enabled;
        self
    }

    /// Selects the pair counting strategy.
    #[must_use]
    pub fn counting(mut self, strategy: CountingStrategy) -> Self {
        self.cfg.counting = strategy;
        self
    }

    /// Enables or disables per-round logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how text corpora are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
    /// Reads at most this many bytes of the combined corpus.
    pub max_bytes: Option<usize>,
    /// Reads at most this many lines of the combined corpus.
    pub max_lines: Option<usize>,
    /// Replaces invalid UTF-8 with U+FFFD instead of failing.
    pub lossy_utf8: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            max_bytes: None,
            max_lines: None,
            lossy_utf8: false,
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Caps the combined corpus to its first `limit` bytes.
    #[must_use]
    pub fn max_bytes(mut self, limit: Option<usize>) -> Self {
        self.cfg.max_bytes = limit;
        self
    }

    /// Caps the combined corpus to its first `limit` lines.
    #[must_use]
    pub fn max_lines(mut self, limit: Option<usize>) -> Self {
        self.cfg.max_lines = limit;
        self
    }

    /// Enables lossy UTF-8 decoding.
    #[must_use]
    pub fn lossy_utf8(mut self, enabled: bool) -> Self {
        self.cfg.lossy_utf8 = enabled;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}

/// Output policy applied when extracting and writing the trained vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct VocabPolicy {
    /// Ordering that determines each symbol's index.
    pub order: VocabOrder,
    /// Removes the end-of-word marker from symbol spellings on output.
    pub strip_end_marker: bool,
}

impl VocabPolicy {
    /// Returns a builder initialised with [`VocabPolicy::default`].
    #[must_use]
    pub fn builder() -> VocabPolicyBuilder {
        VocabPolicyBuilder::default()
    }
}

/// Builder for [`VocabPolicy`].
#[derive(Debug, Default, Clone)]
pub struct VocabPolicyBuilder {
    policy: VocabPolicy,
}

impl VocabPolicyBuilder {
    /// Sets the index ordering.
    #[must_use]
    pub fn order(mut self, order: VocabOrder) -> Self {
        self.policy.order = order;
        self
    }

    /// Enables or disables end-marker stripping.
    #[must_use]
    pub fn strip_end_marker(mut self, enabled: bool) -> Self {
        self.policy.strip_end_marker = enabled;
        self
    }

    /// Finalises the builder.
    pub fn build(self) -> VocabPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builder_applies_overrides() {
        let cfg = TrainerConfig::builder()
            .num_merges(7)
            .start_marker(None::<String>)
            .end_marker("_")
            .counting(CountingStrategy::Recount)
            .show_progress(false)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.num_merges, 7);
        assert_eq!(cfg.start_marker, None);
        assert_eq!(cfg.end_marker, "_");
        assert_eq!(cfg.counting, CountingStrategy::Recount);
    }

    #[test]
    fn zero_merges_is_valid() {
        let cfg = TrainerConfig::builder().num_merges(0).build();
        assert!(cfg.is_ok());
    }

    #[test]
    fn negative_merges_are_rejected() {
        assert_eq!(num_merges_from_signed(0).unwrap(), 0);
        assert_eq!(num_merges_from_signed(12).unwrap(), 12);
        let err = num_merges_from_signed(-1).expect_err("negative budget must fail");
        assert!(matches!(
            err,
            BpeError::InvalidConfig(message) if message.contains("non-negative")
        ));
    }

    #[test]
    fn validate_rejects_bad_markers() {
        let empty_end = TrainerConfig {
            end_marker: String::new(),
            ..TrainerConfig::default()
        };
        assert!(empty_end.validate().is_err());

        let spaced = TrainerConfig {
            end_marker: "</ w>".into(),
            ..TrainerConfig::default()
        };
        assert!(spaced.validate().is_err());

        let same = TrainerConfig {
            start_marker: Some("#".into()),
            end_marker: "#".into(),
            ..TrainerConfig::default()
        };
        let err = same.validate().expect_err("identical markers must fail");
        assert!(matches!(err, BpeError::InvalidConfig(message) if message.contains("differ")));
    }

    #[test]
    fn validate_rejects_zero_min_frequency() {
        let cfg = TrainerConfig {
            min_frequency: 0,
            ..TrainerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_file_fills_missing_fields_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("train.json");
        fs::write(&path, r#"{"num_merges": 3, "counting": "recount"}"#).expect("write config");
        let cfg = TrainerConfig::from_json_file(&path).expect("load config");
        assert_eq!(cfg.num_merges, 3);
        assert_eq!(cfg.counting, CountingStrategy::Recount);
        assert_eq!(cfg.end_marker, DEFAULT_END_MARKER);
    }

    #[test]
    fn json_file_rejects_negative_budget() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("train.json");
        fs::write(&path, r#"{"num_merges": -5}"#).expect("write config");
        let err = TrainerConfig::from_json_file(&path).expect_err("negative budget must fail");
        assert!(matches!(err, BpeError::Serialization(_)));
    }

    #[test]
    fn ingest_builder_overrides_defaults() {
        let cfg = IngestConfig::builder()
            .recursive(false)
            .follow_symlinks(true)
            .max_bytes(Some(64))
            .max_lines(Some(2))
            .lossy_utf8(true)
            .build();
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
        assert_eq!(cfg.max_bytes, Some(64));
        assert_eq!(cfg.max_lines, Some(2));
        assert!(cfg.lossy_utf8);
    }
}
