// Sentiment scorer trait: the strategy interface behind the controller.
//
// Both the model classifier and the lexicon scorer implement this trait.
// Scorers report a raw label in their own spelling; the controller owns
// normalization and stamps the scorer name onto every result.

use anyhow::Result;
use async_trait::async_trait;

use super::labels::SentimentLabel;

/// What a scorer reports for one text, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSentiment {
    /// Label as the scorer spells it (e.g. "POSITIVE", "neg")
    pub label: String,
    /// Classifier confidence, or lexicon compound score
    pub score: f64,
}

/// The sentiment attached to a review.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
    /// Name of the scorer that actually produced this result
    pub model: String,
}

/// Model name recorded for reviews that had no text to score.
pub const SKIPPED_MODEL_NAME: &str = "none";

impl SentimentResult {
    /// Default attached to blank reviews, which never reach a scorer.
    pub fn skipped() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            model: SKIPPED_MODEL_NAME.to_string(),
        }
    }

    /// Whether this is the blank-review placeholder rather than a real score.
    pub fn is_skipped(&self) -> bool {
        self.model == SKIPPED_MODEL_NAME
    }
}

/// Trait for scoring review sentiment.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Identifier written to the `model` column for results from this scorer.
    fn name(&self) -> &str;

    /// Score a single text.
    async fn score_text(&self, text: &str) -> Result<RawSentiment>;

    /// Score multiple texts, returning results in the same order.
    /// Default implementation calls score_text sequentially: scorers
    /// can override for true batching.
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<RawSentiment>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.score_text(text).await?);
        }
        Ok(results)
    }
}

/// Loads the model classifier. Initialization is attempted once per run;
/// an error here sends the whole batch to the lexicon scorer.
pub trait ModelLoader: Send + Sync {
    /// Identifier of the model this loader produces.
    fn model_name(&self) -> &str;

    fn load(&self) -> Result<Box<dyn SentimentScorer>>;
}
