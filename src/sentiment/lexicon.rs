// VADER lexicon scorer: the always-available fallback.
//
// VADER computes a compound polarity score in [-1, 1] from a static
// word-valence dictionary plus rules for negation, intensifiers, and
// punctuation. The dictionary is built once per process by the
// vader_sentiment crate and shared read-only.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;
use vader_sentiment::SentimentIntensityAnalyzer;

use super::labels::SentimentLabel;
use super::traits::{RawSentiment, SentimentScorer};

/// Value of the `model` column for lexicon-scored reviews.
pub const LEXICON_MODEL_NAME: &str = "vader";

pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Compound polarity score for a text, in [-1, 1].
    pub fn compound(&self, text: &str) -> f64 {
        let scores = self.analyzer.polarity_scores(text);
        scores.get("compound").copied().unwrap_or(0.0)
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentScorer for VaderScorer {
    fn name(&self) -> &str {
        LEXICON_MODEL_NAME
    }

    async fn score_text(&self, text: &str) -> Result<RawSentiment> {
        let compound = self.compound(text);
        let label = SentimentLabel::from_compound(compound);

        debug!(
            compound,
            label = label.as_str(),
            text_preview = %crate::output::truncate_chars(text, 50),
            "VADER scored text"
        );

        Ok(RawSentiment {
            label: label.as_str().to_string(),
            score: compound,
        })
    }
}
