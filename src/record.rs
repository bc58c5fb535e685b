//! Display payloads and judgment inputs.
//!
//! Everything here is expressed in *display* (slot) order: the payload is
//! what the presentation layer renders, the judgment is what it hands back.
//! The manager translates between slot order and the table's candidate
//! order, so neither type ever exposes which model produced which slot in
//! an anonymized comparison.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One display slot: a candidate rewrite as shown to the annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    /// Slot label, e.g. `Model 1` or `Neutral`.
    pub label: String,
    /// The candidate text.
    pub text: String,
    /// Previously saved rating for this slot, if any.
    pub rating: Option<String>,
    /// Previously saved suggested rewrite, if the variant collects one.
    pub suggestion: Option<String>,
}

/// A preference question with the previously saved, position-corrected
/// choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceView {
    /// Storage column of the question.
    pub key: String,
    /// The question as posed to the annotator.
    pub prompt: String,
    /// Previously chosen display slot, if any.
    pub choice: Option<usize>,
}

/// Everything the presentation layer needs to render one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayPayload {
    /// Row index of this payload.
    pub index: usize,
    /// Total number of rows in the table.
    pub total: usize,
    /// The original (toxic) text.
    pub original_text: String,
    /// Source classification, if the variant carries one.
    pub class_label: Option<String>,
    /// Style tag, if the variant carries one.
    pub style_tag: Option<String>,
    /// Candidate rewrites in display order.
    pub slots: Vec<SlotView>,
    /// Preference questions with position-corrected saved choices.
    pub preferences: Vec<PreferenceView>,
    /// Shared free-text fields and their saved values.
    pub free_text: BTreeMap<String, String>,
}

impl DisplayPayload {
    /// Progress line in the form `Example 3 out of 50`.
    #[must_use]
    pub fn progress_label(&self) -> String {
        format!("Example {} out of {}", self.index + 1, self.total)
    }
}

/// The judgments entered for one row, in display (slot) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Judgment {
    /// One rating per display slot.
    pub ratings: Vec<Option<String>>,
    /// One suggested rewrite per display slot.
    pub suggestions: Vec<Option<String>>,
    /// One chosen display slot per preference question.
    pub preferences: Vec<Option<usize>>,
    /// Shared free-text fields keyed by storage column.
    pub free_text: BTreeMap<String, String>,
}

impl Judgment {
    /// An empty judgment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rating for a display slot.
    #[must_use]
    pub fn with_rating(mut self, slot: usize, rating: impl Into<String>) -> Self {
        grow_to(&mut self.ratings, slot);
        self.ratings[slot] = Some(rating.into());
        self
    }

    /// Set the suggested rewrite for a display slot.
    #[must_use]
    pub fn with_suggestion(mut self, slot: usize, suggestion: impl Into<String>) -> Self {
        grow_to(&mut self.suggestions, slot);
        self.suggestions[slot] = Some(suggestion.into());
        self
    }

    /// Choose a display slot for a preference question.
    #[must_use]
    pub fn with_preference(mut self, question: usize, slot: usize) -> Self {
        grow_to(&mut self.preferences, question);
        self.preferences[question] = Some(slot);
        self
    }

    /// Set a shared free-text field.
    #[must_use]
    pub fn with_free_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.free_text.insert(key.into(), value.into());
        self
    }

    /// The rating entered for `slot`, if any.
    #[must_use]
    pub fn rating(&self, slot: usize) -> Option<&str> {
        self.ratings
            .get(slot)
            .and_then(|r| r.as_deref())
            .filter(|r| !r.is_empty())
    }
}

fn grow_to<T: Clone>(values: &mut Vec<Option<T>>, index: usize) {
    if values.len() <= index {
        values.resize(index + 1, None);
    }
}

/// How a commit attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitStatus {
    /// The record was written and the cursor advanced.
    Saved,
    /// A required rating was missing; nothing was stored, nothing moved.
    Incomplete,
}

/// Result of a commit attempt: the status plus the payload to render next.
///
/// On [`CommitStatus::Incomplete`] the payload is the unchanged current row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    /// Whether the record was stored.
    pub status: CommitStatus,
    /// The payload to render next.
    pub payload: DisplayPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_grows_sparse_vectors() {
        let judgment = Judgment::new().with_rating(2, "A").with_preference(1, 0);
        assert_eq!(judgment.ratings.len(), 3);
        assert_eq!(judgment.rating(2), Some("A"));
        assert_eq!(judgment.rating(0), None);
        assert_eq!(judgment.preferences, vec![None, Some(0)]);
    }

    #[test]
    fn empty_rating_counts_as_missing() {
        let judgment = Judgment::new().with_rating(0, "");
        assert_eq!(judgment.rating(0), None);
    }

    #[test]
    fn progress_label_is_one_based() {
        let payload = DisplayPayload {
            index: 2,
            total: 50,
            original_text: String::new(),
            class_label: None,
            style_tag: None,
            slots: Vec::new(),
            preferences: Vec::new(),
            free_text: BTreeMap::new(),
        };
        assert_eq!(payload.progress_label(), "Example 3 out of 50");
    }
}
