//! The trained model: symbol inventory, ordered merge rules, and the final table.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{TrainerConfig, VocabPolicy};
use crate::error::Result;
use crate::serialization::{json, tsv};
use crate::symbols::{SymbolId, SymbolTable};
use crate::table::VocabTable;
use crate::vocab::Vocabulary;

/// One learned merge, in the order it was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRule {
    /// Left symbol of the merged pair.
    pub left: SymbolId,
    /// Right symbol of the merged pair.
    pub right: SymbolId,
    /// Symbol formed by concatenating `left` and `right`.
    pub merged: SymbolId,
    /// Pair count when the rule was selected.
    pub frequency: u64,
}

/// Trained BPE model.
#[must_use]
#[derive(Debug, Clone)]
pub struct BpeModel {
    symbols: SymbolTable,
    merges: Vec<MergeRule>,
    table: VocabTable,
    config: TrainerConfig,
}

impl BpeModel {
    /// Constructs a model from the pieces produced by a training session.
    pub fn new(
        symbols: SymbolTable,
        merges: Vec<MergeRule>,
        table: VocabTable,
        config: TrainerConfig,
    ) -> Self {
        Self {
            symbols,
            merges,
            table,
            config,
        }
    }

    /// Every symbol ever interned, including merge intermediates no longer in the table.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Merge rules in application order.
    #[must_use]
    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    /// Merge rules rendered as `(left, right)` texts.
    pub fn merge_texts(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.merges
            .iter()
            .map(|rule| (self.symbols.text(rule.left), self.symbols.text(rule.right)))
    }

    /// The fully merged table.
    #[must_use]
    pub fn table(&self) -> &VocabTable {
        &self.table
    }

    /// Returns the [`TrainerConfig`] used to produce the model.
    #[must_use]
    pub fn trainer_config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Extracts the vocabulary using the ordering in `policy`.
    #[must_use]
    pub fn vocabulary(&self, policy: &VocabPolicy) -> Vocabulary {
        Vocabulary::extract(&self.table, &self.symbols, policy.order)
    }

    /// Number of distinct symbols in the final table.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocabulary(&VocabPolicy::default()).len()
    }

    /// Marker to strip from spellings under `policy`, if any.
    #[must_use]
    pub fn strip_marker(&self, policy: &VocabPolicy) -> Option<&str> {
        policy
            .strip_end_marker
            .then_some(self.config.end_marker.as_str())
    }

    /// Writes the vocabulary as `<index>\t<symbol>` lines.
    pub fn save_vocab<P: AsRef<Path>>(&self, path: P, policy: &VocabPolicy) -> Result<()> {
        let vocab = self.vocabulary(policy);
        tsv::save_vocab_tsv(path, &vocab, self.strip_marker(policy))
    }

    /// Writes the vocabulary as a JSON object mapping symbol to index.
    pub fn save_vocab_json<P: AsRef<Path>>(&self, path: P, policy: &VocabPolicy) -> Result<()> {
        let vocab = self.vocabulary(policy);
        json::save_vocab_json(path, &vocab, self.strip_marker(policy))
    }

    /// Writes the ordered merge list, one `left right` pair per line.
    pub fn save_merges<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tsv::save_merges(path, self.merge_texts())
    }
}
