//! Core training loop: count pairs, select the best one, merge it, repeat.

pub mod pairs;
pub mod word;

use std::time::Instant;
use std::{fmt, path::Path};

use log::{debug, info};

use crate::config::{CountingStrategy, IngestConfig, TrainerBuilder, TrainerConfig};
use crate::corpus::load_text_corpus;
use crate::error::{BpeError, Result};
use crate::metrics::{sample_rss_kb, IterationMetrics, StopReason, TrainingMetrics};
use crate::model::{BpeModel, MergeRule};
use crate::symbols::{Pair, SymbolTable};
use crate::table::VocabTable;

use self::pairs::PairCounts;

/// High-level façade configuring and executing BPE training runs.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// Trained BPE model.
    pub model: BpeModel,
    /// Detailed metrics captured during training.
    pub metrics: TrainingMetrics,
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`TrainerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Trains a model from files on disk according to [`IngestConfig`].
    pub fn train_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<TrainerArtifacts> {
        let corpus = load_text_corpus(inputs, ingest)?;
        self.train_from_text(&corpus)
    }

    /// Trains a model from an in-memory corpus. An empty corpus yields an empty model.
    pub fn train_from_text(&self, corpus: &str) -> Result<TrainerArtifacts> {
        self.train_with_observer(corpus, |_| {})
    }

    /// Trains a model, invoking `on_round` after every completed merge round.
    pub fn train_with_observer<F>(&self, corpus: &str, mut on_round: F) -> Result<TrainerArtifacts>
    where
        F: FnMut(&IterationMetrics),
    {
        let mut session = self.session(corpus)?;
        while let Some(round) = session.step()? {
            on_round(round);
        }
        session.finish()
    }

    /// Prepares a [`TrainingSession`] for step-by-step control.
    pub fn session(&self, corpus: &str) -> Result<TrainingSession> {
        TrainingSession::new(self.cfg.clone(), corpus)
    }
}

/// Training state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    /// More rounds may run; `remaining` is the unspent merge budget.
    Running {
        /// Merge rounds left in the budget.
        remaining: usize,
    },
    /// Terminal state.
    Done(StopReason),
    /// A round broke the training bookkeeping; the table and counts are no longer usable.
    Failed,
}

/// One training run. Owns the word table exclusively and replaces it every round.
#[derive(Debug)]
pub struct TrainingSession {
    cfg: TrainerConfig,
    symbols: SymbolTable,
    table: VocabTable,
    counts: PairCounts,
    merges: Vec<MergeRule>,
    state: TrainingState,
    metrics: TrainingMetrics,
    started: Instant,
}

impl TrainingSession {
    /// Splits `corpus` into the initial table and prepares the first round.
    pub fn new(cfg: TrainerConfig, corpus: &str) -> Result<Self> {
        cfg.validate()?;
        let mut symbols = SymbolTable::new();
        let table = VocabTable::from_corpus(corpus, &cfg, &mut symbols)?;
        Self::from_table(cfg, symbols, table)
    }

    /// Starts a session from an existing table whose ids belong to `symbols`.
    pub fn from_table(cfg: TrainerConfig, symbols: SymbolTable, table: VocabTable) -> Result<Self> {
        cfg.validate()?;
        let counts = PairCounts::from_table(&table);
        let mut metrics = TrainingMetrics::new(cfg.num_merges.min(16_384));
        metrics.total_words = table.total_frequency();
        metrics.initial_distinct_words = table.len();
        metrics.initial_weighted_symbols = table.weighted_symbol_count();
        debug!(
            "initial table: {} words, {} distinct, {} symbols, {} distinct pairs",
            metrics.total_words,
            metrics.initial_distinct_words,
            symbols.len(),
            counts.len()
        );

        let state = if cfg.num_merges == 0 {
            TrainingState::Done(StopReason::MergeBudgetExhausted)
        } else {
            TrainingState::Running {
                remaining: cfg.num_merges,
            }
        };
        if let TrainingState::Done(reason) = state {
            metrics.stop_reason = reason;
        }

        Ok(Self {
            cfg,
            symbols,
            table,
            counts,
            merges: Vec::new(),
            state,
            metrics,
            started: Instant::now(),
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Returns `true` once the session reached a terminal state.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, TrainingState::Done(_) | TrainingState::Failed)
    }

    /// Current word table.
    #[must_use]
    pub fn table(&self) -> &VocabTable {
        &self.table
    }

    /// Symbols interned so far.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Pair counts for the current table.
    #[must_use]
    pub fn counts(&self) -> &PairCounts {
        &self.counts
    }

    /// Merge rules applied so far.
    #[must_use]
    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    /// Runs one round. Returns the round's metrics, or `None` once the session is done.
    ///
    /// An error moves the session to [`TrainingState::Failed`]; every later call errors too.
    pub fn step(&mut self) -> Result<Option<&IterationMetrics>> {
        let remaining = match self.state {
            TrainingState::Running { remaining } => remaining,
            TrainingState::Done(_) => return Ok(None),
            TrainingState::Failed => {
                return Err(BpeError::Internal(
                    "training session failed in an earlier round".into(),
                ))
            }
        };
        match self.run_round(remaining) {
            Ok(true) => Ok(self.metrics.iterations.last()),
            Ok(false) => Ok(None),
            Err(err) => {
                self.state = TrainingState::Failed;
                Err(err)
            }
        }
    }

    /// Performs the round body; `Ok(false)` means training stopped without merging.
    fn run_round(&mut self, remaining: usize) -> Result<bool> {
        let round_start = Instant::now();

        if self.counts.is_empty() {
            self.stop(StopReason::NoPairsRemaining);
            return Ok(false);
        }
        let Some((pair, frequency)) = self.counts.select(&self.symbols, self.cfg.min_frequency)
        else {
            self.stop(StopReason::BelowMinFrequency);
            return Ok(false);
        };

        let merged_symbol = self.symbols.intern_concat(pair.0, pair.1)?;
        let words_before = self.table.total_frequency();
        let symbols_before = self.table.weighted_symbol_count();

        let table = std::mem::take(&mut self.table);
        let merged = table.merge_pair(pair, merged_symbol)?;

        check_invariant(merged.occurrences > 0, || {
            format!(
                "selected pair {:?} with count {frequency} but found no occurrence",
                self.pair_text(pair)
            )
        })?;
        let words_after = merged.table.total_frequency();
        check_invariant(words_after == words_before, || {
            format!("word frequency changed from {words_before} to {words_after}")
        })?;
        let symbols_after = merged.table.weighted_symbol_count();
        check_invariant(symbols_after + merged.occurrences == symbols_before, || {
            format!(
                "weighted symbols went from {symbols_before} to {symbols_after} after {} replacements",
                merged.occurrences
            )
        })?;

        self.table = merged.table;
        match self.cfg.counting {
            CountingStrategy::Incremental => {
                self.counts.apply_deltas(&merged.deltas)?;
                debug_assert_eq!(
                    self.counts,
                    PairCounts::from_table(&self.table),
                    "incremental pair counts diverged from a full recount"
                );
            }
            CountingStrategy::Recount => self.counts = PairCounts::from_table(&self.table),
        }

        self.merges.push(MergeRule {
            left: pair.0,
            right: pair.1,
            merged: merged_symbol,
            frequency,
        });
        let (left, right) = self.pair_text(pair);
        let round = IterationMetrics {
            round: self.merges.len(),
            left: left.to_owned(),
            right: right.to_owned(),
            frequency,
            occurrences: merged.occurrences,
            distinct_pairs: self.counts.len(),
            distinct_words: self.table.len(),
            weighted_symbols: symbols_after,
            elapsed_round: round_start.elapsed(),
            elapsed_total: self.started.elapsed(),
            rss_kb: sample_rss_kb(),
        };

        if self.cfg.show_progress {
            info!(
                "round {:>6} freq {:>8} merged {:?} + {:?} occurrences {:>8} distinct_pairs {:>8}",
                round.round, round.frequency, round.left, round.right, round.occurrences, round.distinct_pairs
            );
        }
        self.metrics.iterations.push(round);

        if remaining == 1 {
            self.stop(StopReason::MergeBudgetExhausted);
        } else {
            self.state = TrainingState::Running {
                remaining: remaining - 1,
            };
        }
        Ok(true)
    }

    /// Runs any remaining rounds and packages the model and metrics.
    pub fn finish(mut self) -> Result<TrainerArtifacts> {
        while self.step()?.is_some() {}
        self.metrics.total_duration = self.started.elapsed();

        let model = BpeModel::new(self.symbols, self.merges, self.table, self.cfg);
        if model.trainer_config().show_progress {
            info!(
                "completed {} merges in {:.2?}; vocab size {}; stop reason {:?}",
                model.merges().len(),
                self.metrics.total_duration,
                model.vocab_size(),
                self.metrics.stop_reason
            );
        }
        Ok(TrainerArtifacts {
            model,
            metrics: self.metrics,
        })
    }

    fn stop(&mut self, reason: StopReason) {
        self.state = TrainingState::Done(reason);
        self.metrics.stop_reason = reason;
    }

    fn pair_text(&self, pair: Pair) -> (&str, &str) {
        (self.symbols.text(pair.0), self.symbols.text(pair.1))
    }
}

/// Surfaces a broken bookkeeping invariant: a panic in debug builds, an error otherwise.
fn check_invariant<F>(holds: bool, describe: F) -> Result<()>
where
    F: FnOnce() -> String,
{
    if holds {
        return Ok(());
    }
    let message = describe();
    debug_assert!(holds, "invariant violated: {message}");
    Err(BpeError::Internal(message))
}

impl fmt::Display for TrainerArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BPE model with vocab size {}", self.model.vocab_size())?;
        writeln!(f, "Merges: {}", self.model.merges().len())?;
        writeln!(f, "Stop reason: {:?}", self.metrics.stop_reason)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
