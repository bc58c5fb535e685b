//! # detox-annotator
//!
//! Session management for human annotation of detoxified text rewrites.
//!
//! A study hands each annotator a CSV batch of toxic texts and their
//! model-generated rewrites. This crate owns everything between the
//! rendered form and the file on disk: the loaded table, the cursor, the
//! randomized-but-frozen left/right swap that counters position bias, and
//! the all-or-nothing save on every commit. The presentation layer (web
//! form, TUI, whatever) stays outside; it only exchanges [`DisplayPayload`]s
//! and [`Judgment`]s with the manager.
//!
//! ## Table variants
//!
//! | Variant | Candidates | Ratings | Swap |
//! |---------|------------|---------|------|
//! | `TwoModel` | two anonymized model rewrites | A–E | randomized, frozen per row |
//! | `ThreeStyle` | Neutral / Formal / Friendly | A, B, F, SKIPPING | — |
//! | `SingleRewrite` | one rewrite | A, B, F, SKIPPING | — |
//!
//! The variant is detected from the CSV header at load time; annotation
//! columns the source omits are created empty.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use detox_annotator::{AnnotationRecordManager, CsvStore, Judgment, SessionOptions};
//!
//! # fn main() -> detox_annotator::Result<()> {
//! let store = CsvStore::new("batches/batch_1.csv");
//! let mut session = AnnotationRecordManager::open(store, SessionOptions::new("ada"))?;
//!
//! // Resume where the last session left off.
//! let index = session.cursor();
//! let payload = session.present(index)?;
//!
//! // Ratings and preferences are given in display order; the manager maps
//! // them back to the true candidates before storing.
//! let judgment = Judgment::new()
//!     .with_rating(0, "A")
//!     .with_rating(1, "C")
//!     .with_preference(0, 1);
//! let outcome = session.commit(payload.index, &judgment)?;
//! println!("{}", outcome.payload.progress_label());
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Notes
//!
//! - **One manager, one session**: all mutable session state (table,
//!   cursor, timer, RNG) lives in one [`AnnotationRecordManager`] with an
//!   explicit open/serve lifecycle; there are no globals.
//! - **The file is the checkpoint**: swap assignments are saved the moment
//!   they are drawn, and commits rewrite the whole table atomically, so
//!   resuming is just re-opening the file and scanning for the first
//!   incomplete record.
//! - **Incomplete submission is not an error**: it is a documented no-op
//!   reported as [`CommitStatus::Incomplete`] so the caller can tell the
//!   user, rather than silently echoing state back.

#![warn(missing_docs)]

mod error;
pub mod manager;
pub mod record;
pub mod schema;
pub mod split;
pub mod swap;
pub mod table;

pub use error::{Error, Result};
pub use manager::{annotation_log_path, AnnotationRecordManager, SessionOptions};
pub use record::{CommitOutcome, CommitStatus, DisplayPayload, Judgment, PreferenceView, SlotView};
pub use schema::{Schema, VariantKind};
pub use split::{split_into_batches, BatchFile, SplitConfig};
pub use swap::SwapState;
pub use table::{CsvStore, MemStore, Row, Table, TableStore};
