//! Interned symbol inventory shared by the splitter, the trainer, and the extractor.

use rustc_hash::FxHashMap;

use crate::error::{BpeError, Result};

/// Symbol identifier used throughout the crate.
pub type SymbolId = u32;
/// Adjacent symbol pair encoded as `(left, right)` identifiers.
pub type Pair = (SymbolId, SymbolId);

/// Bidirectional mapping between symbol texts and their identifiers.
///
/// Identifiers are handed out in interning order, so two symbols are the same symbol exactly when
/// their texts are equal. A merged symbol whose text already exists reuses the existing id.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    texts: Vec<String>,
    ids: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `text`, allocating a new one on first sight.
    pub fn intern(&mut self, text: &str) -> Result<SymbolId> {
        if let Some(&id) = self.ids.get(text) {
            return Ok(id);
        }
        let id = SymbolId::try_from(self.texts.len())
            .map_err(|_| BpeError::Internal("symbol inventory exceeded u32::MAX".into()))?;
        self.texts.push(text.to_owned());
        self.ids.insert(text.to_owned(), id);
        Ok(id)
    }

    /// Interns the concatenation of two existing symbols.
    pub fn intern_concat(&mut self, left: SymbolId, right: SymbolId) -> Result<SymbolId> {
        let mut merged = String::with_capacity(self.text(left).len() + self.text(right).len());
        merged.push_str(self.text(left));
        merged.push_str(self.text(right));
        self.intern(&merged)
    }

    /// Looks up an already interned symbol.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<SymbolId> {
        self.ids.get(text).copied()
    }

    /// Returns the text of `id`.
    ///
    /// Panics if `id` was not produced by this table.
    #[must_use]
    pub fn text(&self, id: SymbolId) -> &str {
        &self.texts[id as usize]
    }

    /// Number of interned symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Returns `true` when nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Iterates `(id, text)` in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str)> + '_ {
        self.texts
            .iter()
            .enumerate()
            .map(|(idx, text)| (idx as SymbolId, text.as_str()))
    }
}
