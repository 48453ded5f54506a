// Row types: one per pipeline stage.
//
// Stages only ever append columns: a `Review` becomes a `ScoredReview` once
// sentiment is attached, and a `TaggedReview` once noun phrases and themes
// are attached. Earlier columns are carried over untouched.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::sentiment::traits::SentimentResult;
use crate::themes::ThemeSet;

/// A cleaned review as it enters the core pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Stable identifier, unique within a run
    pub review_id: u64,
    pub review: String,
    /// Star rating, 1 to 5
    pub rating: u8,
    /// Calendar date, or None when the source date was unparsable
    pub date: Option<NaiveDate>,
    pub bank: String,
    pub source: String,
}

impl Review {
    /// Whether the review has any text worth sending to a scorer.
    /// Blank and whitespace-only reviews are kept in the table but never scored.
    pub fn has_text(&self) -> bool {
        !self.review.trim().is_empty()
    }
}

/// A review with its sentiment attached.
#[derive(Debug, Clone)]
pub struct ScoredReview {
    pub review: Review,
    pub sentiment: SentimentResult,
}

/// A fully analyzed review: the row handed to persistence.
#[derive(Debug, Clone)]
pub struct TaggedReview {
    pub review: Review,
    pub sentiment: SentimentResult,
    /// Lower-cased noun phrases found in the text (may be empty)
    pub noun_phrases: BTreeSet<String>,
    /// Themes whose trigger phrases occur in the text (may be empty)
    pub themes: ThemeSet,
}
