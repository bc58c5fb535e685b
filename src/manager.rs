//! The annotation record manager.
//!
//! One manager instance owns one annotation session: the loaded table, the
//! cursor, the decision timer, and the RNG behind swap assignments. The
//! presentation layer drives it with three calls per interaction cycle:
//! [`present`](AnnotationRecordManager::present) to fetch a row,
//! [`commit`](AnnotationRecordManager::commit) to store judgments and
//! advance, [`go_back`](AnnotationRecordManager::go_back) to step to the
//! previous row.
//!
//! Every mutation is all-or-nothing: the table is saved as a whole, and a
//! failed save restores the in-memory state so the caller can retry.

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::record::{CommitOutcome, CommitStatus, DisplayPayload, Judgment, PreferenceView, SlotView};
use crate::schema::{Schema, NO_SUGGESTION};
use crate::swap::{slot_to_candidate, SwapState};
use crate::table::{Table, TableStore};
use crate::{Error, Result};

/// Options for opening an annotation session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Annotator identity written into every committed record.
    pub annotator: String,
    /// Floor for the resume cursor: the session never starts before this
    /// index, mirroring an explicitly supplied start position.
    pub start_index: usize,
    /// Seed for the swap RNG. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl SessionOptions {
    /// Options for `annotator` with no start floor and an entropy-seeded RNG.
    #[must_use]
    pub fn new(annotator: impl Into<String>) -> Self {
        Self {
            annotator: annotator.into(),
            start_index: 0,
            seed: None,
        }
    }

    /// Set the resume-cursor floor.
    #[must_use]
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }

    /// Seed the swap RNG for reproducible sessions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Owns the table, the swap decisions, the cursor, and the save protocol
/// for one annotation session.
#[derive(Debug)]
pub struct AnnotationRecordManager<S: TableStore> {
    store: S,
    table: Table,
    schema: Schema,
    cursor: usize,
    decision_start: Option<Instant>,
    annotator: String,
    rng: StdRng,
}

impl<S: TableStore> AnnotationRecordManager<S> {
    /// Load the table from `store` and open a session on it.
    ///
    /// Detects the layout variant, backfills the annotation columns the
    /// source omits, and positions the cursor at the first incomplete row
    /// (respecting the options' start floor). Opening twice on an unchanged
    /// source yields an identical state.
    pub fn open(store: S, options: SessionOptions) -> Result<Self> {
        if options.annotator.trim().is_empty() {
            return Err(Error::invalid_input("annotator name must not be empty"));
        }
        let mut table = store.load()?;
        if table.is_empty() {
            return Err(Error::EmptyTable);
        }
        let schema = Schema::detect(&table)?;
        schema.prepare(&mut table);
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let len = table.len();
        let mut manager = Self {
            store,
            table,
            schema,
            cursor: 0,
            decision_start: None,
            annotator: options.annotator,
            rng,
        };
        let resume = manager.resume_index()?;
        manager.cursor = resume.max(options.start_index).min(len - 1);
        log::info!(
            "opened {} session with {} rows, resuming at row {}",
            manager.schema.kind.name(),
            len,
            manager.cursor
        );
        Ok(manager)
    }

    /// The detected record layout.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The in-memory table, as last saved or loaded.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has zero rows (never true for an open session).
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The row index currently displayed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First row with any required rating empty, or the last row if every
    /// record is complete.
    ///
    /// An O(n) scan; tables are batch-sized, not unbounded.
    pub fn resume_index(&self) -> Result<usize> {
        if self.table.is_empty() {
            return Err(Error::EmptyTable);
        }
        for (index, row) in self.table.rows().iter().enumerate() {
            if !self.schema.is_complete(row) {
                return Ok(index);
            }
        }
        Ok(self.table.len() - 1)
    }

    /// Payload for the row at `index`, swap-corrected for display.
    ///
    /// For a two-model row seen for the first time this draws the fair-coin
    /// swap assignment and saves the table before returning, so a crash
    /// between display and commit cannot re-randomize the ordering on
    /// resume. Starts (or restarts) the decision timer.
    pub fn present(&mut self, index: usize) -> Result<DisplayPayload> {
        self.check_bounds(index)?;
        self.ensure_swap(index)?;
        self.decision_start = Some(Instant::now());
        self.cursor = index;
        Ok(self.payload(index))
    }

    /// Store the judgments for `index` and advance.
    ///
    /// Judgments arrive in display order and are mapped back to candidate
    /// order before storage, so the stored value for a candidate does not
    /// depend on which slot it was displayed in. The cursor advances to
    /// `min(index + 1, len - 1)` and the next row's payload is returned;
    /// on the last row, repeated commits keep overwriting that record.
    ///
    /// A submission with any required rating missing is a no-op: nothing is
    /// stored and the unchanged payload comes back with
    /// [`CommitStatus::Incomplete`].
    pub fn commit(&mut self, index: usize, judgment: &Judgment) -> Result<CommitOutcome> {
        self.check_bounds(index)?;
        let slots = self.schema.candidates.len();
        if judgment.ratings.len() > slots || judgment.suggestions.len() > slots {
            return Err(Error::invalid_input(format!(
                "judgment covers more than the {} displayed candidates",
                slots
            )));
        }
        if judgment.preferences.len() > self.schema.preferences.len() {
            return Err(Error::invalid_input(format!(
                "judgment answers more than the {} preference questions",
                self.schema.preferences.len()
            )));
        }
        for slot in judgment.preferences.iter().flatten() {
            if *slot >= slots {
                return Err(Error::invalid_input(format!(
                    "preference slot {} out of range for {} candidates",
                    slot, slots
                )));
            }
        }
        if !(0..slots).all(|slot| judgment.rating(slot).is_some()) {
            return Ok(CommitOutcome {
                status: CommitStatus::Incomplete,
                payload: self.payload(index),
            });
        }
        for rating in (0..slots).filter_map(|slot| judgment.rating(slot)) {
            self.schema.validate_rating(rating)?;
        }

        let elapsed = self
            .decision_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let swapped = self.row_swapped(index);
        let Some(snapshot) = self.table.row(index).cloned() else {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.table.len(),
            });
        };

        {
            let Self {
                table,
                schema,
                annotator,
                ..
            } = &mut *self;
            if let Some(row) = table.row_mut(index) {
                for slot in 0..slots {
                    let candidate = &schema.candidates[slot_to_candidate(slot, swapped, slots)];
                    if let Some(rating) = judgment.rating(slot) {
                        row.set(candidate.rating_col, rating);
                    }
                    if let Some(col) = candidate.suggestion_col {
                        let suggestion = judgment
                            .suggestions
                            .get(slot)
                            .and_then(|s| s.clone())
                            .filter(|s| !s.is_empty())
                            .unwrap_or_else(|| NO_SUGGESTION.to_string());
                        row.set(col, suggestion);
                    }
                }
                for (question, spec) in schema.preferences.iter().enumerate() {
                    match judgment.preferences.get(question).copied().flatten() {
                        Some(slot) => {
                            let candidate =
                                &schema.candidates[slot_to_candidate(slot, swapped, slots)];
                            row.set(spec.key, candidate.key);
                        }
                        None => row.set(spec.key, ""),
                    }
                }
                for field in &schema.free_text {
                    let value = judgment
                        .free_text
                        .get(field.key)
                        .map(String::as_str)
                        .filter(|v| !v.is_empty())
                        .unwrap_or(field.default);
                    row.set(field.key, value);
                }
                row.set(schema.annotator_col, annotator.as_str());
                row.set(schema.elapsed_col, format!("{:.3}", elapsed));
                row.set(schema.timestamp_col, format!("{:.3}", unix_timestamp()));
            }
        }

        if let Err(e) = self.store.save(&self.table) {
            if let Some(row) = self.table.row_mut(index) {
                *row = snapshot;
            }
            return Err(e);
        }
        self.decision_start = None;

        let next = (index + 1).min(self.table.len() - 1);
        // The commit above is already durable; an error from here concerns
        // the next row's swap assignment only.
        let payload = self.present(next)?;
        Ok(CommitOutcome {
            status: CommitStatus::Saved,
            payload,
        })
    }

    /// Step back one row (never below zero) and present it.
    ///
    /// Stored judgments are never mutated by stepping back.
    pub fn go_back(&mut self, index: usize) -> Result<DisplayPayload> {
        self.check_bounds(index)?;
        self.present(index.saturating_sub(1))
    }

    fn check_bounds(&self, index: usize) -> Result<()> {
        if index < self.table.len() {
            return Ok(());
        }
        Err(Error::IndexOutOfRange {
            index,
            len: self.table.len(),
        })
    }

    /// Draw and freeze the swap assignment for a two-model row that has
    /// never been displayed. Frozen assignments are never recomputed.
    fn ensure_swap(&mut self, index: usize) -> Result<()> {
        let Some(col) = self.schema.swap_col else {
            return Ok(());
        };
        let current = self
            .table
            .row(index)
            .map(|row| SwapState::parse(row.get(col)))
            .unwrap_or(SwapState::Undecided);
        if current != SwapState::Undecided {
            return Ok(());
        }
        let state = SwapState::decide(&mut self.rng);
        if let Some(row) = self.table.row_mut(index) {
            row.set(col, state.as_cell());
        }
        if let Err(e) = self.store.save(&self.table) {
            // Leave the row undecided so a retry draws cleanly.
            if let Some(row) = self.table.row_mut(index) {
                row.set(col, "");
            }
            return Err(e);
        }
        log::debug!("row {}: swap assignment {}", index, state.as_cell());
        Ok(())
    }

    fn row_swapped(&self, index: usize) -> bool {
        match (self.schema.swap_col, self.table.row(index)) {
            (Some(col), Some(row)) => SwapState::parse(row.get(col)).is_swapped(),
            _ => false,
        }
    }

    fn payload(&self, index: usize) -> DisplayPayload {
        let row = &self.table.rows()[index];
        let swapped = self.row_swapped(index);
        let slots_len = self.schema.candidates.len();

        let slots = (0..slots_len)
            .map(|slot| {
                let candidate = &self.schema.candidates[slot_to_candidate(slot, swapped, slots_len)];
                SlotView {
                    label: self.schema.slot_label(slot),
                    text: row.get(candidate.text_col).to_string(),
                    rating: non_empty(row.get(candidate.rating_col)),
                    suggestion: candidate
                        .suggestion_col
                        .and_then(|col| non_empty(row.get(col))),
                }
            })
            .collect();

        let preferences = self
            .schema
            .preferences
            .iter()
            .map(|spec| {
                let choice = self
                    .schema
                    .candidate_position(row.get(spec.key))
                    .map(|candidate| slot_to_candidate(candidate, swapped, slots_len));
                PreferenceView {
                    key: spec.key.to_string(),
                    prompt: spec.prompt.to_string(),
                    choice,
                }
            })
            .collect();

        let free_text = self
            .schema
            .free_text
            .iter()
            .map(|field| (field.key.to_string(), row.get(field.key).to_string()))
            .collect();

        DisplayPayload {
            index,
            total: self.table.len(),
            original_text: row.get(self.schema.original_col).to_string(),
            class_label: self.schema.class_col.map(|col| row.get(col).to_string()),
            style_tag: self.schema.style_col.map(|col| row.get(col).to_string()),
            slots,
            preferences,
            free_text,
        }
    }
}

/// Path of the annotation log for a batch file: `<dir>/annotations_<file>`.
///
/// The log doubles as the session checkpoint: its rows determine where the
/// next session resumes.
#[must_use]
pub fn annotation_log_path(annotations_dir: &Path, dataset_path: &Path) -> PathBuf {
    let name = dataset_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset.csv");
    annotations_dir.join(format!("annotations_{}", name))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
