//! Helpers for writing and reading trained vocabularies.

pub mod json;
pub mod tsv;

pub use json::{save_vocab_json, vocab_json};
pub use tsv::{read_vocab_tsv, save_merges, save_vocab_tsv, write_merges, write_vocab_tsv};
