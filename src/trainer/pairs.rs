//! Pair statistics and merge selection.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::error::{BpeError, Result};
use crate::symbols::{Pair, SymbolTable};
use crate::table::VocabTable;

/// Frequency-weighted counts of every adjacent symbol pair in a [`VocabTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairCounts {
    counts: FxHashMap<Pair, u64>,
}

impl PairCounts {
    /// Counts every adjacent pair of every sequence, weighting each by the sequence frequency.
    #[must_use]
    pub fn from_table(table: &VocabTable) -> Self {
        let mut counts = FxHashMap::default();
        for (word, frequency) in table.iter() {
            word.for_each_pair(|pair| *counts.entry(pair).or_insert(0) += frequency);
        }
        Self { counts }
    }

    /// Count recorded for `pair`, zero when absent.
    #[must_use]
    pub fn get(&self, pair: Pair) -> u64 {
        self.counts.get(&pair).copied().unwrap_or(0)
    }

    /// Number of distinct pairs with a non-zero count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` when no pair remains, which ends training.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates `(pair, count)` in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Pair, u64)> + '_ {
        self.counts.iter().map(|(&pair, &count)| (pair, count))
    }

    /// Folds merge deltas into the running counts, dropping pairs that reach zero.
    ///
    /// A delta that would drive a count below zero means the bookkeeping diverged from the table
    /// and is reported as [`BpeError::Internal`].
    pub fn apply_deltas(&mut self, deltas: &FxHashMap<Pair, i64>) -> Result<()> {
        for (&pair, &delta) in deltas {
            let amount = delta.unsigned_abs();
            match delta.cmp(&0) {
                Ordering::Greater => *self.counts.entry(pair).or_insert(0) += amount,
                Ordering::Less => match self.counts.entry(pair) {
                    Entry::Occupied(mut occupied) if *occupied.get() >= amount => {
                        *occupied.get_mut() -= amount;
                        if *occupied.get() == 0 {
                            occupied.remove();
                        }
                    }
                    Entry::Occupied(occupied) => {
                        return Err(BpeError::Internal(format!(
                            "pair {pair:?} count {} cannot absorb delta {delta}",
                            occupied.get()
                        )));
                    }
                    Entry::Vacant(_) => {
                        return Err(BpeError::Internal(format!(
                            "pair {pair:?} has no count to absorb delta {delta}"
                        )));
                    }
                },
                Ordering::Equal => {}
            }
        }
        Ok(())
    }

    /// Picks the next merge: the highest count at or above `min_frequency`.
    ///
    /// Ties are broken by the lexicographically smallest `(left text, right text)`, which is a
    /// total order over pairs, so the winner does not depend on hash iteration order.
    #[must_use]
    pub fn select(&self, symbols: &SymbolTable, min_frequency: u64) -> Option<(Pair, u64)> {
        let mut best: Option<(Pair, u64)> = None;
        for (&pair, &count) in &self.counts {
            if count < min_frequency {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_pair, best_count)) => match count.cmp(&best_count) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => compare_text(symbols, pair, best_pair) == Ordering::Less,
                },
            };
            if better {
                best = Some((pair, count));
            }
        }
        best
    }
}

fn compare_text(symbols: &SymbolTable, a: Pair, b: Pair) -> Ordering {
    symbols
        .text(a.0)
        .cmp(symbols.text(b.0))
        .then_with(|| symbols.text(a.1).cmp(symbols.text(b.1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;

    fn build_table(corpus: &str, start: Option<&str>) -> (VocabTable, SymbolTable) {
        let cfg = TrainerConfig::builder()
            .start_marker(start)
            .show_progress(false)
            .build()
            .unwrap();
        let mut symbols = SymbolTable::new();
        let table = VocabTable::from_corpus(corpus, &cfg, &mut symbols).unwrap();
        (table, symbols)
    }

    fn pair(symbols: &SymbolTable, left: &str, right: &str) -> Pair {
        (symbols.get(left).unwrap(), symbols.get(right).unwrap())
    }

    #[test]
    fn counts_are_frequency_weighted() {
        let (table, symbols) = build_table("low low lower", None);
        let counts = PairCounts::from_table(&table);
        assert_eq!(counts.get(pair(&symbols, "l", "o")), 3);
        assert_eq!(counts.get(pair(&symbols, "w", "</w>")), 2);
        assert_eq!(counts.get(pair(&symbols, "e", "r")), 1);
        assert_eq!(counts.get(pair(&symbols, "r", "l")), 0);
    }

    #[test]
    fn single_symbol_sequences_contribute_nothing() {
        let mut symbols = SymbolTable::new();
        let only = symbols.intern("word</w>").unwrap();
        let table = VocabTable::from_entries(vec![(
            crate::trainer::word::Word::new(vec![only]),
            9,
        )]);
        assert!(PairCounts::from_table(&table).is_empty());
        assert!(PairCounts::from_table(&VocabTable::default()).is_empty());
    }

    #[test]
    fn select_prefers_highest_count() {
        let (table, symbols) = build_table("aaabdaaabac", Some("<w>"));
        let counts = PairCounts::from_table(&table);
        let (best, count) = counts.select(&symbols, 1).unwrap();
        assert_eq!(best, pair(&symbols, "a", "a"));
        assert_eq!(count, 4);
    }

    #[test]
    fn select_breaks_ties_by_text() {
        let (table, symbols) = build_table("low lower", Some("<w>"));
        let counts = PairCounts::from_table(&table);
        assert_eq!(counts.get(pair(&symbols, "l", "o")), 2);
        assert_eq!(counts.get(pair(&symbols, "o", "w")), 2);
        let (best, _) = counts.select(&symbols, 1).unwrap();
        assert_eq!(best, pair(&symbols, "<w>", "l"));

        let (table, symbols) = build_table("low lower", None);
        let counts = PairCounts::from_table(&table);
        let (best, _) = counts.select(&symbols, 1).unwrap();
        assert_eq!(best, pair(&symbols, "l", "o"));
    }

    #[test]
    fn select_honours_min_frequency() {
        let (table, symbols) = build_table("ab cd", None);
        let counts = PairCounts::from_table(&table);
        assert!(counts.select(&symbols, 2).is_none());
        assert!(counts.select(&symbols, 1).is_some());
    }

    #[test]
    fn apply_deltas_tracks_counts_and_rejects_underflow() {
        let mut counts = PairCounts::default();
        let mut deltas = FxHashMap::default();
        deltas.insert((1, 2), 5);
        counts.apply_deltas(&deltas).unwrap();
        assert_eq!(counts.get((1, 2)), 5);

        deltas.insert((1, 2), -5);
        counts.apply_deltas(&deltas).unwrap();
        assert!(counts.is_empty());

        deltas.insert((1, 2), -1);
        let err = counts.apply_deltas(&deltas).expect_err("underflow must fail");
        assert!(matches!(err, BpeError::Internal(_)));
    }
}
