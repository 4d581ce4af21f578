//! Extraction of the trained symbol inventory from the final table.

use std::borrow::Cow;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::symbols::{SymbolId, SymbolTable};
use crate::table::VocabTable;

/// Ordering policy that fixes the index assigned to each extracted symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VocabOrder {
    /// Sort by symbol text (byte-wise).
    #[default]
    Lexicographic,
    /// Order of first appearance when scanning the table entries in order.
    FirstSeen,
    /// Order in which symbols were created: corpus characters and markers first, then merged
    /// symbols by merge round.
    Creation,
}

/// Distinct symbols of a trained table; a symbol's position is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    symbols: Vec<String>,
}

impl Vocabulary {
    /// Collects every distinct symbol appearing in `table`, markers included, indexed per `order`.
    #[must_use]
    pub fn extract(table: &VocabTable, symbols: &SymbolTable, order: VocabOrder) -> Self {
        let mut seen: FxHashSet<SymbolId> = FxHashSet::default();
        let mut ids: Vec<SymbolId> = Vec::new();
        for (word, _) in table.iter() {
            for &id in word.symbols() {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }

        match order {
            VocabOrder::Lexicographic => ids.sort_by(|&a, &b| symbols.text(a).cmp(symbols.text(b))),
            VocabOrder::Creation => ids.sort_unstable(),
            VocabOrder::FirstSeen => {}
        }

        Self {
            symbols: ids.into_iter().map(|id| symbols.text(id).to_owned()).collect(),
        }
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` when the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates `(index, symbol)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.symbols.iter().map(String::as_str).enumerate()
    }

    /// Index of `symbol`, if present.
    #[must_use]
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Returns `true` when `symbol` is part of the vocabulary.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.index_of(symbol).is_some()
    }

    /// Symbols spelled according to the output policy: with `strip` set, every occurrence of that
    /// marker is removed from the spelling. Indices are unchanged, so spellings may repeat.
    pub fn spellings<'a>(
        &'a self,
        strip: Option<&'a str>,
    ) -> impl Iterator<Item = (usize, Cow<'a, str>)> + 'a {
        self.iter()
            .map(move |(index, symbol)| (index, spell(symbol, strip)))
    }
}

fn spell<'a>(symbol: &'a str, strip: Option<&str>) -> Cow<'a, str> {
    match strip {
        Some(marker) if !marker.is_empty() && symbol.contains(marker) => {
            Cow::Owned(symbol.replace(marker, ""))
        }
        _ => Cow::Borrowed(symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;

    fn sample() -> (VocabTable, SymbolTable) {
        let cfg = TrainerConfig::builder()
            .show_progress(false)
            .build()
            .unwrap();
        let mut symbols = SymbolTable::new();
        let table = VocabTable::from_corpus("ba ab", &cfg, &mut symbols).unwrap();
        (table, symbols)
    }

    #[test]
    fn lexicographic_order_sorts_by_text() {
        let (table, symbols) = sample();
        let vocab = Vocabulary::extract(&table, &symbols, VocabOrder::Lexicographic);
        let texts: Vec<&str> = vocab.iter().map(|(_, s)| s).collect();
        assert_eq!(texts, vec!["</w>", "<w>", "a", "b"]);
    }

    #[test]
    fn first_seen_and_creation_orders() {
        let (table, symbols) = sample();
        let first_seen = Vocabulary::extract(&table, &symbols, VocabOrder::FirstSeen);
        let texts: Vec<&str> = first_seen.iter().map(|(_, s)| s).collect();
        assert_eq!(texts, vec!["<w>", "b", "a", "</w>"]);

        let creation = Vocabulary::extract(&table, &symbols, VocabOrder::Creation);
        let texts: Vec<&str> = creation.iter().map(|(_, s)| s).collect();
        assert_eq!(texts, vec!["<w>", "</w>", "b", "a"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let (table, symbols) = sample();
        for order in [
            VocabOrder::Lexicographic,
            VocabOrder::FirstSeen,
            VocabOrder::Creation,
        ] {
            assert_eq!(
                Vocabulary::extract(&table, &symbols, order),
                Vocabulary::extract(&table, &symbols, order)
            );
        }
    }

    #[test]
    fn empty_table_yields_empty_vocabulary() {
        let vocab = Vocabulary::extract(
            &VocabTable::default(),
            &SymbolTable::new(),
            VocabOrder::default(),
        );
        assert!(vocab.is_empty());
    }

    #[test]
    fn spellings_strip_marker_but_keep_indices() {
        let vocab = Vocabulary {
            symbols: vec!["lo".into(), "w</w>".into(), "</w>".into()],
        };
        let spelled: Vec<(usize, String)> = vocab
            .spellings(Some("</w>"))
            .map(|(i, s)| (i, s.into_owned()))
            .collect();
        assert_eq!(
            spelled,
            vec![(0, "lo".into()), (1, "w".into()), (2, String::new())]
        );
        assert_eq!(vocab.index_of("w</w>"), Some(1));
    }
}
