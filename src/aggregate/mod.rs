// Aggregate views over the tagged review table: sentiment counts per bank,
// sentiment counts per star rating, and mean sentiment score per rating.
//
// The report is a snapshot recomputed from scratch on every run. Blank
// reviews carry a placeholder sentiment that no scorer produced; they are
// counted as unscored and left out of all three views.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::reviews::models::TaggedReview;
use crate::sentiment::labels::SentimentLabel;

/// Ratings always listed in the per-rating views, even when empty.
pub const RATINGS: std::ops::RangeInclusive<u8> = 1..=5;

/// Review counts per sentiment label. The three canonical cells are always
/// present; labels outside the canonical set get extra cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    #[serde(flatten)]
    pub other: BTreeMap<String, usize>,
}

impl LabelCounts {
    pub fn add(&mut self, label: &SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Other(name) => *self.other.entry(name.clone()).or_insert(0) += 1,
        }
    }

    pub fn get(&self, label: &str) -> usize {
        match label {
            "positive" => self.positive,
            "negative" => self.negative,
            "neutral" => self.neutral,
            other => self.other.get(other).copied().unwrap_or(0),
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral + self.other.values().sum::<usize>()
    }

    /// Label columns in display order: canonical first, then extras.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = vec!["positive", "negative", "neutral"];
        labels.extend(self.other.keys().map(String::as_str));
        labels
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub by_bank: BTreeMap<String, LabelCounts>,
    pub by_rating: BTreeMap<u8, LabelCounts>,
    /// NaN for a rating with no scored reviews
    pub mean_score_by_rating: BTreeMap<u8, f64>,
    /// Rows skipped by the scorers (blank text)
    pub unscored: usize,
}

/// Compute all three views. Pure; never fails.
pub fn aggregate(rows: &[TaggedReview]) -> AggregateReport {
    let mut by_bank: BTreeMap<String, LabelCounts> = BTreeMap::new();
    let mut by_rating: BTreeMap<u8, LabelCounts> =
        RATINGS.map(|r| (r, LabelCounts::default())).collect();
    let mut score_sums: BTreeMap<u8, (f64, usize)> = RATINGS.map(|r| (r, (0.0, 0))).collect();
    let mut extra_labels: BTreeSet<String> = BTreeSet::new();
    let mut unscored = 0;

    for row in rows {
        // Bank still listed, with zero cells
        let bank_counts = by_bank.entry(row.review.bank.clone()).or_default();
        if row.sentiment.is_skipped() {
            unscored += 1;
            continue;
        }

        let label = &row.sentiment.label;
        if let SentimentLabel::Other(name) = label {
            extra_labels.insert(name.clone());
        }

        bank_counts.add(label);
        by_rating.entry(row.review.rating).or_default().add(label);

        let (sum, count) = score_sums.entry(row.review.rating).or_insert((0.0, 0));
        *sum += row.sentiment.score;
        *count += 1;
    }

    // Zero-fill extra label columns so every row has the same cells
    for counts in by_bank.values_mut().chain(by_rating.values_mut()) {
        for label in &extra_labels {
            counts.other.entry(label.clone()).or_insert(0);
        }
    }

    let mean_score_by_rating = score_sums
        .into_iter()
        .map(|(rating, (sum, count))| {
            let mean = if count == 0 { f64::NAN } else { sum / count as f64 };
            (rating, mean)
        })
        .collect();

    AggregateReport {
        by_bank,
        by_rating,
        mean_score_by_rating,
        unscored,
    }
}
