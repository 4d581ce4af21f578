//! Per-word symbol sequences and the in-word merge primitive.

use crate::symbols::{Pair, SymbolId};

/// Outcome of merging a specific pair within a [`Word`].
#[derive(Debug, Default)]
pub(crate) struct MergeOutcome {
    /// Number of pair occurrences replaced inside the word.
    pub(crate) merges: usize,
    /// Unweighted pair count deltas emitted by the merge. Negative values represent removed
    /// adjacencies, positive values newly formed ones.
    pub(crate) deltas: Vec<(Pair, i64)>,
}

/// Symbol sequence for one distinct corpus word, markers included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Word {
    symbols: Vec<SymbolId>,
}

impl Word {
    /// Builds a word from an owned symbol sequence.
    #[must_use]
    pub fn new(symbols: Vec<SymbolId>) -> Self {
        Self { symbols }
    }

    /// Returns the symbols in order.
    #[must_use]
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// Number of symbols in the word.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` when the word holds no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns true when the word contains at least two symbols.
    #[must_use]
    pub fn has_pairs(&self) -> bool {
        self.symbols.len() >= 2
    }

    /// Invokes the provided closure for each adjacent symbol pair, left to right.
    pub fn for_each_pair<F>(&self, mut f: F)
    where
        F: FnMut(Pair),
    {
        for window in self.symbols.windows(2) {
            f((window[0], window[1]));
        }
    }

    /// Replaces every non-overlapping `(left, right)` occurrence with `replacement`.
    ///
    /// Scanning is left to right over whole symbols; after a match the scan resumes past the
    /// consumed right symbol, so `a a a` merged on `(a, a)` yields `aa a`.
    pub(crate) fn merge(
        &mut self,
        left: SymbolId,
        right: SymbolId,
        replacement: SymbolId,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        if !self.has_pairs() {
            return outcome;
        }

        let len = self.symbols.len();
        let mut merged = Vec::with_capacity(len);
        let mut i = 0usize;
        while i < len {
            if i + 1 < len && self.symbols[i] == left && self.symbols[i + 1] == right {
                merged.push(replacement);
                outcome.merges += 1;
                i += 2;
            } else {
                merged.push(self.symbols[i]);
                i += 1;
            }
        }

        if outcome.merges == 0 {
            return outcome;
        }

        // Retire every old adjacency and emit every new one; the table folds the two into net
        // deltas, so unaffected neighbours cancel out.
        self.for_each_pair(|pair| outcome.deltas.push((pair, -1)));
        self.symbols = merged;
        self.for_each_pair(|pair| outcome.deltas.push((pair, 1)));
        outcome
    }
}
