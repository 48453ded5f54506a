// Sentiment labels and the normalization table.
//
// Scorers report labels in whatever spelling they were trained with
// ("POSITIVE", "pos", "LABEL_1", ...). Everything downstream sees one of the
// three canonical labels; a label outside the table is passed through
// lowercased as `Other` rather than treated as an error.

use std::fmt;

/// Compound scores above this are positive.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound scores below this are negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// A label no alias maps to, kept lowercased
    Other(String),
}

impl SentimentLabel {
    /// Derive a label from a lexicon compound score using the fixed thresholds.
    pub fn from_compound(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Other(raw) => raw,
        }
    }

    /// True for positive, negative, and neutral.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, SentimentLabel::Other(_))
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a raw scorer label onto the canonical set. Never fails.
///
/// `LABEL_0`/`LABEL_1` are the default SST-2 class names when a model
/// export carries no id2label table.
pub fn normalize_label(raw: &str) -> SentimentLabel {
    let lower = raw.to_lowercase();
    match lower.as_str() {
        "positive" | "pos" | "label_1" => SentimentLabel::Positive,
        "negative" | "neg" | "label_0" => SentimentLabel::Negative,
        "neutral" | "neu" => SentimentLabel::Neutral,
        _ => SentimentLabel::Other(lower),
    }
}
