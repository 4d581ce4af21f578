//! Frequency-weighted table of distinct word symbol sequences.
//!
//! The table is built once from the corpus by [`VocabTable::from_corpus`] and then replaced
//! wholesale every training round by [`VocabTable::merge_pair`], which consumes the previous table.

use rustc_hash::FxHashMap;

use crate::config::TrainerConfig;
use crate::error::{BpeError, Result};
use crate::symbols::{Pair, SymbolId, SymbolTable};
use crate::trainer::word::Word;

/// Distinct symbol sequences with their corpus multiplicity, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct VocabTable {
    entries: Vec<(Word, u64)>,
}

/// Result of rewriting a table with one merge rule.
#[derive(Debug)]
pub struct MergedTable {
    /// Table after the rewrite.
    pub table: VocabTable,
    /// Frequency-weighted number of pair occurrences replaced.
    pub occurrences: u64,
    /// Net frequency-weighted pair count changes caused by the rewrite. Zero entries are dropped.
    pub deltas: FxHashMap<Pair, i64>,
}

/// Returns `true` for characters that separate corpus words: Unicode whitespace plus the ASCII
/// information separators U+001C..=U+001F.
#[must_use]
pub fn is_word_separator(ch: char) -> bool {
    ch.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&ch)
}

/// Accumulates entries while folding identical sequences into one.
#[derive(Default)]
struct TableBuilder {
    entries: Vec<(Word, u64)>,
    index: FxHashMap<Word, usize>,
}

impl TableBuilder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::default(),
        }
    }

    /// Appends an entry known to differ from every indexed one, without indexing it.
    fn push_distinct(&mut self, word: Word, frequency: u64) {
        self.entries.push((word, frequency));
    }

    fn add(&mut self, word: Word, frequency: u64) {
        if let Some(&slot) = self.index.get(&word) {
            self.entries[slot].1 += frequency;
        } else {
            self.index.insert(word.clone(), self.entries.len());
            self.entries.push((word, frequency));
        }
    }

    fn finish(self) -> VocabTable {
        VocabTable {
            entries: self.entries,
        }
    }
}

impl VocabTable {
    /// Splits `corpus` on [`is_word_separator`] and builds one marked symbol sequence per distinct
    /// word.
    ///
    /// Characters are Unicode scalar values and pass through without normalization. The start
    /// marker (if configured) is prepended as its own symbol; the end marker is appended as its
    /// own symbol or, with [`TrainerConfig::attach_end_marker`], glued onto the last character.
    pub fn from_corpus(
        corpus: &str,
        cfg: &TrainerConfig,
        symbols: &mut SymbolTable,
    ) -> Result<Self> {
        let mut spellings: Vec<(&str, u64)> = Vec::new();
        let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
        for word in corpus.split(is_word_separator).filter(|word| !word.is_empty()) {
            match seen.get(word) {
                Some(&slot) => spellings[slot].1 += 1,
                None => {
                    seen.insert(word, spellings.len());
                    spellings.push((word, 1));
                }
            }
        }

        let start = match &cfg.start_marker {
            Some(marker) => Some(symbols.intern(marker)?),
            None => None,
        };
        let end = if cfg.attach_end_marker {
            None
        } else {
            Some(symbols.intern(&cfg.end_marker)?)
        };

        let mut builder = TableBuilder::with_capacity(spellings.len());
        let mut buf = [0u8; 4];
        for (spelling, frequency) in spellings {
            let mut sequence = Vec::with_capacity(spelling.chars().count() + 2);
            sequence.extend(start);
            let mut chars = spelling.chars().peekable();
            while let Some(ch) = chars.next() {
                let text = ch.encode_utf8(&mut buf);
                if end.is_none() && chars.peek().is_none() {
                    let glued = format!("{text}{}", cfg.end_marker);
                    sequence.push(symbols.intern(&glued)?);
                } else {
                    sequence.push(symbols.intern(text)?);
                }
            }
            sequence.extend(end);
            builder.add(Word::new(sequence), frequency);
        }
        Ok(builder.finish())
    }

    /// Builds a table from explicit sequences, summing the frequency of repeated sequences.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Word, u64)>,
    {
        let mut builder = TableBuilder::default();
        for (word, frequency) in entries {
            builder.add(word, frequency);
        }
        builder.finish()
    }

    /// Number of distinct sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table holds no sequences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates sequences with their frequency in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&Word, u64)> + '_ {
        self.entries.iter().map(|(word, frequency)| (word, *frequency))
    }

    /// Sum of all frequencies, i.e. the number of corpus words represented.
    #[must_use]
    pub fn total_frequency(&self) -> u64 {
        self.entries.iter().map(|(_, frequency)| frequency).sum()
    }

    /// Frequency-weighted symbol count across all sequences.
    #[must_use]
    pub fn weighted_symbol_count(&self) -> u64 {
        self.entries
            .iter()
            .map(|(word, frequency)| word.len() as u64 * frequency)
            .sum()
    }

    /// Renders the canonical key of `word`: its symbol texts joined by single spaces.
    #[must_use]
    pub fn key(word: &Word, symbols: &SymbolTable) -> String {
        word.symbols()
            .iter()
            .map(|&id| symbols.text(id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns `(key, frequency)` for every sequence in first-appearance order.
    #[must_use]
    pub fn keyed(&self, symbols: &SymbolTable) -> Vec<(String, u64)> {
        self.iter()
            .map(|(word, frequency)| (Self::key(word, symbols), frequency))
            .collect()
    }

    /// Consumes the table and rewrites every sequence with the merge rule `pair -> replacement`.
    ///
    /// Sequences that become identical are folded into a single entry with summed frequency.
    /// Entry order is preserved; a folded entry keeps the position of its first occurrence.
    pub fn merge_pair(self, pair: Pair, replacement: SymbolId) -> Result<MergedTable> {
        let mut builder = TableBuilder::with_capacity(self.entries.len());
        let mut deltas: FxHashMap<Pair, i64> = FxHashMap::default();
        let mut occurrences = 0u64;

        for (mut word, frequency) in self.entries {
            let outcome = word.merge(pair.0, pair.1, replacement);
            if outcome.merges > 0 {
                let weight = i64::try_from(frequency).map_err(|_| {
                    BpeError::Internal(format!("word frequency {frequency} exceeds i64::MAX"))
                })?;
                occurrences += outcome.merges as u64 * frequency;
                for (affected, delta) in outcome.deltas {
                    *deltas.entry(affected).or_insert(0) += delta * weight;
                }
            }
            // The input holds no duplicates, so a rewritten word can only collide with another
            // word that contains the replacement symbol. Everything else moves over untouched.
            if word.symbols().contains(&replacement) {
                builder.add(word, frequency);
            } else {
                builder.push_distinct(word, frequency);
            }
        }

        deltas.retain(|_, delta| *delta != 0);
        Ok(MergedTable {
            table: builder.finish(),
            occurrences,
            deltas,
        })
    }
}
