// Model-first, lexicon-fallback sentiment controller.
//
// A run tries the model classifier once. Initialization or any inference
// error sends the entire batch to the lexicon scorer, so every review in a
// run carries the same `model` value (blank reviews aside). The fallback is
// logged, never raised.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::labels::normalize_label;
use super::traits::{ModelLoader, RawSentiment, SentimentResult, SentimentScorer};
use crate::reviews::models::{Review, ScoredReview};

/// Default number of texts per model forward pass.
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub struct SentimentPipeline {
    /// None when the model path is disabled (REVIEWLENS_FORCE_LEXICON)
    model: Option<Box<dyn ModelLoader>>,
    lexicon: Box<dyn SentimentScorer>,
    batch_size: usize,
}

/// Outcome of scoring one batch of reviews.
#[derive(Debug)]
pub struct SentimentRun {
    /// Input rows in their original order, each with sentiment attached
    pub reviews: Vec<ScoredReview>,
    /// Name of the scorer that handled the batch
    pub scorer: String,
    /// Why the model path was abandoned, if it was
    pub fallback_reason: Option<String>,
    /// Blank reviews given the default neutral result without scoring
    pub skipped: usize,
}

impl SentimentPipeline {
    pub fn new(
        model: Option<Box<dyn ModelLoader>>,
        lexicon: Box<dyn SentimentScorer>,
        batch_size: usize,
    ) -> Self {
        Self {
            model,
            lexicon,
            batch_size: batch_size.max(1),
        }
    }

    /// Lexicon-only pipeline.
    pub fn lexicon_only(lexicon: Box<dyn SentimentScorer>) -> Self {
        Self::new(None, lexicon, DEFAULT_BATCH_SIZE)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Attach sentiment to every review, preserving order and count.
    ///
    /// Only a lexicon failure is an error; model failures fall back.
    pub async fn run(&self, reviews: Vec<Review>) -> Result<SentimentRun> {
        let scored_indices: Vec<usize> = reviews
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_text())
            .map(|(i, _)| i)
            .collect();
        let skipped = reviews.len() - scored_indices.len();

        if scored_indices.is_empty() {
            info!(skipped, "No review text to score");
            let scorer = self.lexicon.name().to_string();
            return Ok(SentimentRun {
                reviews: attach(reviews, Vec::new(), &scored_indices, &scorer),
                scorer,
                fallback_reason: None,
                skipped,
            });
        }

        let texts: Vec<String> = scored_indices
            .iter()
            .map(|&i| reviews[i].review.clone())
            .collect();

        let (raw, scorer, fallback_reason) = match self.score_with_model(&texts).await {
            Some(Ok((raw, name))) => (raw, name, None),
            Some(Err(e)) => {
                let reason = format!("{e:#}");
                warn!(
                    error = %reason,
                    lexicon = self.lexicon.name(),
                    "Model sentiment failed, scoring whole batch with lexicon"
                );
                let raw = self.score_with_lexicon(&texts).await?;
                (raw, self.lexicon.name().to_string(), Some(reason))
            }
            None => {
                info!(lexicon = self.lexicon.name(), "Model disabled, using lexicon");
                let raw = self.score_with_lexicon(&texts).await?;
                (raw, self.lexicon.name().to_string(), None)
            }
        };

        info!(
            scored = raw.len(),
            skipped,
            scorer = %scorer,
            "Sentiment scoring complete"
        );

        Ok(SentimentRun {
            reviews: attach(reviews, raw, &scored_indices, &scorer),
            scorer,
            fallback_reason,
            skipped,
        })
    }

    /// Returns None if no model is configured.
    async fn score_with_model(&self, texts: &[String]) -> Option<Result<(Vec<RawSentiment>, String)>> {
        let loader = self.model.as_ref()?;
        Some(self.try_model(loader.as_ref(), texts).await)
    }

    async fn try_model(
        &self,
        loader: &dyn ModelLoader,
        texts: &[String],
    ) -> Result<(Vec<RawSentiment>, String)> {
        let model = loader
            .load()
            .with_context(|| format!("Failed to load model {}", loader.model_name()))?;
        info!(model = model.name(), count = texts.len(), "Scoring with model");
        let raw = score_in_batches(model.as_ref(), texts, self.batch_size).await?;
        Ok((raw, model.name().to_string()))
    }

    async fn score_with_lexicon(&self, texts: &[String]) -> Result<Vec<RawSentiment>> {
        score_in_batches(self.lexicon.as_ref(), texts, self.batch_size).await
    }
}

async fn score_in_batches(
    scorer: &dyn SentimentScorer,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<RawSentiment>> {
    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Sentiment [{bar:30}] {pos}/{len} ({eta})")
            .expect("valid template"),
    );

    let mut results = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let batch = match scorer.score_batch(chunk).await {
            Ok(batch) => batch,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        };
        if batch.len() != chunk.len() {
            pb.finish_and_clear();
            anyhow::bail!(
                "{} returned {} results for {} texts",
                scorer.name(),
                batch.len(),
                chunk.len()
            );
        }
        results.extend(batch);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    Ok(results)
}

/// Zip raw results back onto their rows; unscored rows get the default.
fn attach(
    reviews: Vec<Review>,
    raw: Vec<RawSentiment>,
    scored_indices: &[usize],
    scorer: &str,
) -> Vec<ScoredReview> {
    let mut raw = raw.into_iter();
    let mut next_scored = scored_indices.iter().peekable();

    reviews
        .into_iter()
        .enumerate()
        .map(|(i, review)| {
            let sentiment = if next_scored.peek() == Some(&&i) {
                next_scored.next();
                match raw.next() {
                    Some(r) => SentimentResult {
                        label: normalize_label(&r.label),
                        score: r.score,
                        model: scorer.to_string(),
                    },
                    None => SentimentResult::skipped(),
                }
            } else {
                SentimentResult::skipped()
            };
            ScoredReview { review, sentiment }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::labels::SentimentLabel;
    use crate::sentiment::lexicon::VaderScorer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn review(id: u64, text: &str) -> Review {
        Review {
            review_id: id,
            review: text.to_string(),
            rating: 4,
            date: None,
            bank: "CBE".to_string(),
            source: "Google Play".to_string(),
        }
    }

    /// Always says POSITIVE with high confidence.
    struct FixedModel;

    #[async_trait]
    impl SentimentScorer for FixedModel {
        fn name(&self) -> &str {
            "fixed-model"
        }
        async fn score_text(&self, _text: &str) -> Result<RawSentiment> {
            Ok(RawSentiment {
                label: "POSITIVE".to_string(),
                score: 0.98,
            })
        }
    }

    /// Fails on the Nth batch.
    struct FlakyModel {
        fail_on: usize,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SentimentScorer for FlakyModel {
        fn name(&self) -> &str {
            "flaky-model"
        }
        async fn score_text(&self, _text: &str) -> Result<RawSentiment> {
            unreachable!("batches only")
        }
        async fn score_batch(&self, texts: &[String]) -> Result<Vec<RawSentiment>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                anyhow::bail!("inference blew up");
            }
            Ok(texts
                .iter()
                .map(|_| RawSentiment {
                    label: "NEGATIVE".to_string(),
                    score: 0.9,
                })
                .collect())
        }
    }

    struct Loader<F: Fn() -> Result<Box<dyn SentimentScorer>> + Send + Sync>(F);

    impl<F: Fn() -> Result<Box<dyn SentimentScorer>> + Send + Sync> ModelLoader for Loader<F> {
        fn model_name(&self) -> &str {
            "test-model"
        }
        fn load(&self) -> Result<Box<dyn SentimentScorer>> {
            (self.0)()
        }
    }

    fn fixed() -> Result<Box<dyn SentimentScorer>> {
        Ok(Box::new(FixedModel))
    }

    fn pipeline(loader: impl ModelLoader + 'static, batch_size: usize) -> SentimentPipeline {
        SentimentPipeline::new(Some(Box::new(loader)), Box::new(VaderScorer::new()), batch_size)
    }

    #[tokio::test]
    async fn test_model_path_used_when_available() {
        let p = pipeline(Loader(fixed), 2);
        let run = p
            .run(vec![review(1, "meh"), review(2, "fine"), review(3, "ok")])
            .await
            .unwrap();

        assert_eq!(run.scorer, "fixed-model");
        assert!(run.fallback_reason.is_none());
        assert_eq!(run.reviews.len(), 3);
        for r in &run.reviews {
            assert_eq!(r.sentiment.label, SentimentLabel::Positive);
            assert_eq!(r.sentiment.model, "fixed-model");
        }
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_to_lexicon() {
        let p = pipeline(
            Loader(|| -> Result<Box<dyn SentimentScorer>> { anyhow::bail!("no weights") }),
            32,
        );
        let run = p
            .run(vec![review(1, "I love this app"), review(2, "I hate this app")])
            .await
            .unwrap();

        assert_eq!(run.scorer, "vader");
        let reason = run.fallback_reason.unwrap();
        assert!(reason.contains("Failed to load model test-model"), "got: {reason}");
        assert!(reason.contains("no weights"), "got: {reason}");
        assert_eq!(run.reviews[0].sentiment.label, SentimentLabel::Positive);
        assert_eq!(run.reviews[1].sentiment.label, SentimentLabel::Negative);
        assert!(run.reviews.iter().all(|r| r.sentiment.model == "vader"));
    }

    #[tokio::test]
    async fn test_mid_run_failure_rescores_whole_batch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader_calls = Arc::clone(&calls);
        let p = pipeline(
            Loader(move || -> Result<Box<dyn SentimentScorer>> {
                Ok(Box::new(FlakyModel {
                    fail_on: 1,
                    calls: Arc::clone(&loader_calls),
                }))
            }),
            1,
        );

        let run = p
            .run(vec![review(1, "great"), review(2, "awful"), review(3, "good")])
            .await
            .unwrap();

        // The first batch succeeded on the model but must not leak through
        assert_eq!(run.scorer, "vader");
        assert!(run.reviews.iter().all(|r| r.sentiment.model == "vader"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_reviews_skipped_and_order_preserved() {
        let p = pipeline(Loader(fixed), 32);
        let run = p
            .run(vec![review(10, "good"), review(11, "   "), review(12, "nice")])
            .await
            .unwrap();

        assert_eq!(run.skipped, 1);
        let ids: Vec<u64> = run.reviews.iter().map(|r| r.review.review_id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(run.reviews[1].sentiment, SentimentResult::skipped());
        assert_eq!(run.reviews[2].sentiment.model, "fixed-model");
    }

    #[tokio::test]
    async fn test_empty_and_all_blank_batches() {
        let p = pipeline(
            Loader(|| -> Result<Box<dyn SentimentScorer>> { anyhow::bail!("should not be loaded") }),
            32,
        );

        let run = p.run(Vec::new()).await.unwrap();
        assert!(run.reviews.is_empty());

        let run = p.run(vec![review(1, ""), review(2, " ")]).await.unwrap();
        assert_eq!(run.skipped, 2);
        assert!(run.fallback_reason.is_none());
        assert!(run.reviews.iter().all(|r| r.sentiment.model == "none"));
    }

    #[tokio::test]
    async fn test_lexicon_only() {
        let p = SentimentPipeline::lexicon_only(Box::new(VaderScorer::new()));
        let run = p.run(vec![review(1, "This is the worst bank app")]).await.unwrap();
        assert_eq!(run.scorer, "vader");
        assert!(run.fallback_reason.is_none());
        assert_eq!(run.reviews[0].sentiment.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_batch_size_clamped() {
        let p = SentimentPipeline::new(None, Box::new(VaderScorer::new()), 0);
        assert_eq!(p.batch_size(), 1);
    }
}
