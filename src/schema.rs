//! Record layouts for the annotation table variants.
//!
//! # The Variant Problem
//!
//! The annotation tables come in a small family of near-identical layouts,
//! each produced by a different stage of the detoxification study:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ Variant       │ Original     │ Candidates               │ Ratings  │
//! ├────────────────────────────────────────────────────────────────────┤
//! │ TwoModel      │ comment      │ model_detox_mian / lora  │ A..E     │
//! │ ThreeStyle    │ text         │ Neutral/Formal/Friendly  │ A B F    │
//! │ SingleRewrite │ text         │ rewrite                  │ A B F    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rather than one loosely typed row, the layouts form a closed set of
//! [`Schema`] values selected from the detected column header at load time.
//! Each schema knows its required raw columns, the annotation columns it
//! backfills, its rating alphabet, and (for [`VariantKind::TwoModel`]) the
//! column that freezes the left/right swap assignment.

use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::{Error, Result};

/// Sentinel written into candidate-text cells that the source left blank.
pub const EMPTY_SENTINEL: &str = "[empty]";

/// Stored value when the annotator had no class correction to suggest.
pub const CORRECT_CLASSIFICATION: &str = "[Correct Classification]";

/// Stored value when a free-text suggestion was left blank.
pub const NO_SUGGESTION: &str = "No Suggestion";

/// Stored value when the comments field was left blank.
pub const NO_COMMENTS: &str = "No Comments";

/// Toxicity classes the annotator may suggest instead of the source label.
pub const TOXICITY_CLASSES: &[&str] = &[
    "Insult",
    "Threat",
    "Obscene",
    "Identity_attack",
    "Sexual_explicit",
    "Not Toxic",
];

/// Rating alphabet for the two-model comparison (five ordinal grades).
pub const RATINGS_A_TO_E: &[&str] = &["A", "B", "C", "D", "E"];

/// Rating alphabet for the style variants (gold/silver/fail/skip).
pub const RATINGS_ABF_SKIP: &[&str] = &["A", "B", "F", "SKIPPING"];

/// Closed set of record layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum VariantKind {
    /// Two anonymized model rewrites, compared side by side with a randomized
    /// left/right swap.
    TwoModel,
    /// Three named style rewrites (Neutral, Formal, Friendly).
    ThreeStyle,
    /// A single rewrite rated on its own.
    SingleRewrite,
}

impl VariantKind {
    /// Short name for display and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::TwoModel => "two-model",
            VariantKind::ThreeStyle => "three-style",
            VariantKind::SingleRewrite => "single-rewrite",
        }
    }
}

/// One rated candidate: its text column and annotation columns.
#[derive(Debug, Clone)]
pub struct CandidateSpec {
    /// Stable candidate label, independent of display position.
    pub key: &'static str,
    /// Label shown next to the candidate when positions are not anonymized.
    pub display_label: &'static str,
    /// Column holding the candidate text.
    pub text_col: &'static str,
    /// Column holding the annotator's rating for this candidate.
    pub rating_col: &'static str,
    /// Column holding the annotator's suggested rewrite, if the variant
    /// collects one per candidate.
    pub suggestion_col: Option<&'static str>,
}

/// A preference question posed over the displayed candidates.
#[derive(Debug, Clone)]
pub struct PreferenceSpec {
    /// Column the choice is stored in (as the true candidate key).
    pub key: &'static str,
    /// The question as posed to the annotator.
    pub prompt: &'static str,
}

/// A shared free-text field and its stored default when left blank.
#[derive(Debug, Clone)]
pub struct FreeTextSpec {
    /// Column the text is stored in.
    pub key: &'static str,
    /// Value stored when the annotator leaves the field empty.
    pub default: &'static str,
}

/// The record layout of one annotation table.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Which member of the closed variant set this is.
    pub kind: VariantKind,
    /// Column holding the original (toxic) text.
    pub original_col: &'static str,
    /// Column holding the source classification, if the variant carries one.
    pub class_col: Option<&'static str>,
    /// Column holding the style tag, if the variant carries one.
    pub style_col: Option<&'static str>,
    /// The rated candidates, in storage order.
    pub candidates: Vec<CandidateSpec>,
    /// Preference questions (two-candidate variants only).
    pub preferences: Vec<PreferenceSpec>,
    /// Shared free-text fields.
    pub free_text: Vec<FreeTextSpec>,
    /// Column the annotator identity is written to.
    pub annotator_col: &'static str,
    /// Column the elapsed decision time (seconds) is written to.
    pub elapsed_col: &'static str,
    /// Column the commit timestamp (Unix seconds) is written to.
    pub timestamp_col: &'static str,
    /// Column freezing the left/right swap assignment, if the variant
    /// anonymizes display positions.
    pub swap_col: Option<&'static str>,
    /// Allowed rating symbols.
    pub rating_alphabet: &'static [&'static str],
}

impl Schema {
    /// The two-model comparison layout.
    #[must_use]
    pub fn two_model() -> Self {
        Schema {
            kind: VariantKind::TwoModel,
            original_col: "comment",
            class_col: None,
            style_col: Some("style_case"),
            candidates: vec![
                CandidateSpec {
                    key: "mian",
                    display_label: "Model 1",
                    text_col: "model_detox_mian",
                    rating_col: "rating_model_detox_mian",
                    suggestion_col: None,
                },
                CandidateSpec {
                    key: "lora",
                    display_label: "Model 2",
                    text_col: "model_detox_lora",
                    rating_col: "rating_model_detox_lora",
                    suggestion_col: None,
                },
            ],
            preferences: vec![
                PreferenceSpec {
                    key: "preferred_transformation",
                    prompt: "Which one keeps the semantics better?",
                },
                PreferenceSpec {
                    key: "user_preferred",
                    prompt: "Which one would you prefer for personal usage?",
                },
            ],
            free_text: Vec::new(),
            annotator_col: "annotator",
            elapsed_col: "annotation_time",
            timestamp_col: "timestamp",
            swap_col: Some("display_swapped"),
            rating_alphabet: RATINGS_A_TO_E,
        }
    }

    /// The three-style comparison layout.
    #[must_use]
    pub fn three_style() -> Self {
        Schema {
            kind: VariantKind::ThreeStyle,
            original_col: "text",
            class_col: Some("Class"),
            style_col: None,
            candidates: vec![
                CandidateSpec {
                    key: "neutral",
                    display_label: "Neutral",
                    text_col: "Neutral",
                    rating_col: "Rating_Neutral",
                    suggestion_col: Some("Suggested_Transformation_Neutral"),
                },
                CandidateSpec {
                    key: "formal",
                    display_label: "Formal",
                    text_col: "Formal",
                    rating_col: "Rating_Formal",
                    suggestion_col: Some("Suggested_Transformation_Formal"),
                },
                CandidateSpec {
                    key: "friendly",
                    display_label: "Friendly",
                    text_col: "Friendly",
                    rating_col: "Rating_Friendly",
                    suggestion_col: Some("Suggested_Transformation_Friendly"),
                },
            ],
            preferences: Vec::new(),
            free_text: vec![
                FreeTextSpec {
                    key: "suggested_class",
                    default: CORRECT_CLASSIFICATION,
                },
                FreeTextSpec {
                    key: "comments",
                    default: NO_COMMENTS,
                },
            ],
            annotator_col: "annotator",
            elapsed_col: "annotation_time",
            timestamp_col: "timestamp",
            swap_col: None,
            rating_alphabet: RATINGS_ABF_SKIP,
        }
    }

    /// The single-rewrite layout.
    #[must_use]
    pub fn single_rewrite() -> Self {
        Schema {
            kind: VariantKind::SingleRewrite,
            original_col: "text",
            class_col: None,
            style_col: Some("style"),
            candidates: vec![CandidateSpec {
                key: "rewrite",
                display_label: "Rewrite",
                text_col: "rewrite",
                rating_col: "rating",
                suggestion_col: Some("suggested_rewrite"),
            }],
            preferences: Vec::new(),
            free_text: vec![FreeTextSpec {
                key: "comments",
                default: NO_COMMENTS,
            }],
            annotator_col: "annotator",
            elapsed_col: "annotation_time",
            timestamp_col: "timestamp",
            swap_col: None,
            rating_alphabet: RATINGS_ABF_SKIP,
        }
    }

    /// Select the layout matching the table's header.
    ///
    /// Fails with [`Error::Schema`] when no variant's required raw columns
    /// are present.
    pub fn detect(table: &Table) -> Result<Self> {
        if table.has_column("model_detox_mian") && table.has_column("model_detox_lora") {
            if !table.has_column("comment") {
                return Err(Error::schema(
                    "two-model table is missing the 'comment' column",
                ));
            }
            return Ok(Self::two_model());
        }
        if table.has_column("text") {
            if ["Neutral", "Formal", "Friendly"]
                .iter()
                .any(|c| table.has_column(c))
            {
                return Ok(Self::three_style());
            }
            if table.has_column("rewrite") {
                return Ok(Self::single_rewrite());
            }
        }
        Err(Error::schema(
            "no known annotation layout: expected 'comment' + 'model_detox_mian'/'model_detox_lora' \
             (two-model), 'text' + 'Neutral'/'Formal'/'Friendly' (three-style), \
             or 'text' + 'rewrite' (single-rewrite)",
        ))
    }

    /// Backfill the columns this layout expects but the source omits.
    ///
    /// Candidate text columns missing from a three-style table are created
    /// with the [`EMPTY_SENTINEL`]; annotation columns are created empty.
    /// Idempotent, so re-loading an already prepared table changes nothing.
    pub fn prepare(&self, table: &mut Table) {
        for candidate in &self.candidates {
            if self.kind == VariantKind::ThreeStyle {
                table.ensure_column_filled(candidate.text_col, EMPTY_SENTINEL);
            }
            table.ensure_column(candidate.rating_col);
            if let Some(col) = candidate.suggestion_col {
                table.ensure_column(col);
            }
        }
        if let Some(col) = self.class_col {
            table.ensure_column(col);
        }
        if let Some(col) = self.style_col {
            table.ensure_column(col);
        }
        for preference in &self.preferences {
            table.ensure_column(preference.key);
        }
        for field in &self.free_text {
            table.ensure_column(field.key);
        }
        table.ensure_column(self.annotator_col);
        table.ensure_column(self.elapsed_col);
        table.ensure_column(self.timestamp_col);
        if let Some(col) = self.swap_col {
            table.ensure_column(col);
        }
    }

    /// Whether every required rating cell of `row` is filled.
    pub fn is_complete(&self, row: &crate::table::Row) -> bool {
        self.candidates
            .iter()
            .all(|c| !row.get(c.rating_col).is_empty())
    }

    /// Check a rating symbol against this layout's alphabet.
    pub fn validate_rating(&self, value: &str) -> Result<()> {
        if self.rating_alphabet.iter().any(|r| *r == value) {
            return Ok(());
        }
        Err(Error::invalid_input(format!(
            "rating '{}' is not in the {} alphabet {:?}",
            value,
            self.kind.name(),
            self.rating_alphabet
        )))
    }

    /// Position of the candidate with `key` in storage order.
    #[must_use]
    pub fn candidate_position(&self, key: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.key == key)
    }

    /// Label for a display slot: anonymized position labels for the
    /// two-model variant, candidate names otherwise.
    #[must_use]
    pub fn slot_label(&self, slot: usize) -> String {
        match self.kind {
            VariantKind::TwoModel => format!("Model {}", slot + 1),
            _ => self
                .candidates
                .get(slot)
                .map(|c| c.display_label.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Join the selected class corrections in stored form, e.g. `[Insult][Threat]`.
///
/// An empty selection means the source classification was correct.
#[must_use]
pub fn format_suggested_classes(selected: &[&str]) -> String {
    if selected.is_empty() {
        return CORRECT_CLASSIFICATION.to_string();
    }
    selected.iter().map(|c| format!("[{}]", c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn table_with(headers: &[&str]) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect())
    }

    #[test]
    fn detects_two_model() {
        let table = table_with(&["comment", "model_detox_mian", "model_detox_lora"]);
        let schema = Schema::detect(&table).unwrap();
        assert_eq!(schema.kind, VariantKind::TwoModel);
        assert_eq!(schema.candidates.len(), 2);
        assert_eq!(schema.rating_alphabet, RATINGS_A_TO_E);
    }

    #[test]
    fn detects_three_style_with_partial_columns() {
        // Only one of the three style columns present: still three-style,
        // the missing ones get backfilled at prepare time.
        let table = table_with(&["text", "Formal"]);
        let schema = Schema::detect(&table).unwrap();
        assert_eq!(schema.kind, VariantKind::ThreeStyle);
    }

    #[test]
    fn detects_single_rewrite() {
        let table = table_with(&["text", "rewrite", "style"]);
        let schema = Schema::detect(&table).unwrap();
        assert_eq!(schema.kind, VariantKind::SingleRewrite);
    }

    #[test]
    fn two_model_without_comment_column_is_schema_error() {
        let table = table_with(&["model_detox_mian", "model_detox_lora"]);
        let err = Schema::detect(&table).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.to_string().contains("comment"));
    }

    #[test]
    fn unknown_layout_is_schema_error() {
        let table = table_with(&["id", "body"]);
        assert!(matches!(
            Schema::detect(&table),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn prepare_backfills_and_is_idempotent() {
        let mut table = table_with(&["text", "Neutral"]);
        let mut row = crate::table::Row::default();
        row.set("text", "toxic");
        row.set("Neutral", "calm");
        table.push_row(row);

        let schema = Schema::three_style();
        schema.prepare(&mut table);
        let after_first = table.clone();
        schema.prepare(&mut table);
        assert_eq!(table, after_first);

        assert_eq!(table.rows()[0].get("Formal"), EMPTY_SENTINEL);
        assert_eq!(table.rows()[0].get("Friendly"), EMPTY_SENTINEL);
        assert_eq!(table.rows()[0].get("Neutral"), "calm");
        assert!(table.has_column("Rating_Neutral"));
        assert!(table.has_column("suggested_class"));
        assert!(table.has_column("timestamp"));
    }

    #[test]
    fn completeness_requires_every_rating() {
        let schema = Schema::two_model();
        let mut row = crate::table::Row::default();
        assert!(!schema.is_complete(&row));
        row.set("rating_model_detox_mian", "A");
        assert!(!schema.is_complete(&row));
        row.set("rating_model_detox_lora", "C");
        assert!(schema.is_complete(&row));
    }

    #[test]
    fn rating_validation_uses_variant_alphabet() {
        let two = Schema::two_model();
        assert!(two.validate_rating("E").is_ok());
        assert!(two.validate_rating("SKIPPING").is_err());

        let three = Schema::three_style();
        assert!(three.validate_rating("SKIPPING").is_ok());
        assert!(three.validate_rating("C").is_err());
    }

    #[test]
    fn slot_labels_anonymize_two_model_only() {
        assert_eq!(Schema::two_model().slot_label(0), "Model 1");
        assert_eq!(Schema::two_model().slot_label(1), "Model 2");
        assert_eq!(Schema::three_style().slot_label(2), "Friendly");
    }

    #[test]
    fn suggested_class_formatting() {
        assert_eq!(format_suggested_classes(&[]), CORRECT_CLASSIFICATION);
        assert_eq!(
            format_suggested_classes(&["Insult", "Threat"]),
            "[Insult][Threat]"
        );
    }
}
