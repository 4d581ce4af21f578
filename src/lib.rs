//! Word-level byte pair encoding (BPE) vocabulary training library and CLI.
//!
//! The crate splits a text corpus into a frequency-weighted table of distinct words, each a
//! sequence of character symbols framed by word boundary markers, then repeatedly merges the
//! most frequent adjacent symbol pair until the merge budget is spent or no pair remains. The
//! distinct symbols of the final table form the trained vocabulary.
//!
//! ```no_run
//! use wbpe::{IngestConfig, Trainer, TrainerConfig, VocabPolicy};
//!
//! # fn main() -> wbpe::Result<()> {
//! let trainer_cfg = TrainerConfig::builder()
//!     .num_merges(1000)
//!     .show_progress(false)
//!     .build()?;
//! let trainer = Trainer::new(trainer_cfg);
//! let artifacts = trainer.train_from_paths(&["/path/to/corpus.txt"], &IngestConfig::default())?;
//! let policy = VocabPolicy::builder().strip_end_marker(true).build();
//! artifacts.model.save_vocab("vocab.txt", &policy)?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Users targeting the library only
//! can disable default features: `wbpe = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod model;
pub mod serialization;
pub mod symbols;
pub mod table;
pub mod trainer;
pub mod vocab;

pub use config::{
    CountingStrategy, IngestConfig, TrainerBuilder, TrainerConfig, VocabPolicy,
};
pub use error::{BpeError, Result};
pub use metrics::{IterationMetrics, StopReason, TrainingMetrics};
pub use model::{BpeModel, MergeRule};
pub use symbols::{Pair, SymbolId, SymbolTable};
pub use table::VocabTable;
pub use trainer::{Trainer, TrainerArtifacts, TrainingSession, TrainingState};
pub use vocab::{VocabOrder, Vocabulary};
