//! Metrics describing the evolution of the training process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason a training run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of merge rounds was performed (or was zero).
    MergeBudgetExhausted,
    /// Every sequence collapsed to a single symbol, or the corpus was empty.
    NoPairsRemaining,
    /// Pairs remain but none reaches the minimum merge frequency.
    BelowMinFrequency,
}

/// Metrics captured for each merge round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// Sequential round number (1-indexed).
    pub round: usize,
    /// Text of the left symbol of the merged pair.
    pub left: String,
    /// Text of the right symbol of the merged pair.
    pub right: String,
    /// Pair count at selection time.
    pub frequency: u64,
    /// Frequency-weighted number of occurrences rewritten.
    pub occurrences: u64,
    /// Distinct pairs remaining after the round.
    pub distinct_pairs: usize,
    /// Distinct sequences remaining after the round.
    pub distinct_words: usize,
    /// Frequency-weighted symbol count after the round.
    pub weighted_symbols: u64,
    /// Execution time for the round.
    pub elapsed_round: Duration,
    /// Total time elapsed since training started.
    pub elapsed_total: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

/// Aggregate metrics produced by a training session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetrics {
    /// Corpus words represented by the table.
    pub total_words: u64,
    /// Distinct words before training.
    pub initial_distinct_words: usize,
    /// Frequency-weighted symbol count before training.
    pub initial_weighted_symbols: u64,
    /// Per-round snapshots accrued during training.
    pub iterations: Vec<IterationMetrics>,
    /// Total duration of the training session.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
}

impl TrainingMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            total_words: 0,
            initial_distinct_words: 0,
            initial_weighted_symbols: 0,
            iterations: Vec::with_capacity(capacity),
            total_duration: Duration::ZERO,
            stop_reason: StopReason::MergeBudgetExhausted,
        }
    }

    /// Ratio of weighted symbols after training to before; `1.0` when nothing was merged.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        match self.iterations.last() {
            Some(last) if self.initial_weighted_symbols > 0 => {
                last.weighted_symbols as f64 / self.initial_weighted_symbols as f64
            }
            _ => 1.0,
        }
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs;

    let status = fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| {
            rest.split_whitespace()
                .find_map(|part| part.parse::<usize>().ok())
        })
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_ratio_defaults_to_one() {
        let metrics = TrainingMetrics::new(0);
        assert!((metrics.compression_ratio() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_reason_serializes_by_name() {
        let json = serde_json::to_string(&StopReason::NoPairsRemaining).unwrap();
        assert_eq!(json, "\"NoPairsRemaining\"");
    }
}
