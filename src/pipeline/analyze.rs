// Analysis pipeline: cleaned reviews -> tagged table + aggregate report.
//
// Stages run strictly forward and only add columns:
// 1. Sentiment (model first, lexicon fallback for the whole batch)
// 2. Per-bank TF-IDF keywords and per-review noun phrases
// 3. Theme tags from the lexicon
// 4. Aggregate counts and means

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{self, AggregateReport};
use crate::keywords::tfidf::{self, RankedKeyword, TfIdfParams};
use crate::keywords::traits::PhraseExtractor;
use crate::reviews::models::{Review, TaggedReview};
use crate::sentiment::controller::SentimentPipeline;
use crate::themes::lexicon::ThemeLexicon;

/// Everything a run produces.
#[derive(Debug)]
pub struct Analysis {
    pub rows: Vec<TaggedReview>,
    pub bank_keywords: BTreeMap<String, Vec<RankedKeyword>>,
    pub report: AggregateReport,
    /// Scorer that produced the sentiment column
    pub scorer: String,
    pub fallback_reason: Option<String>,
}

/// Run every stage over `reviews`. Row order and count are preserved.
pub async fn run(
    reviews: Vec<Review>,
    sentiment: &SentimentPipeline,
    phrases: &dyn PhraseExtractor,
    themes: &ThemeLexicon,
    params: &TfIdfParams,
) -> Result<Analysis> {
    let total = reviews.len();
    info!(reviews = total, "Starting analysis");

    let scored = sentiment.run(reviews).await?;

    let bank_keywords = tfidf::bank_keywords(scored.reviews.iter().map(|s| &s.review), params);

    let rows: Vec<TaggedReview> = scored
        .reviews
        .into_iter()
        .map(|s| {
            let (noun_phrases, theme_set) = if s.review.has_text() {
                (phrases.extract(&s.review.review), themes.tag(&s.review.review))
            } else {
                (BTreeSet::new(), Default::default())
            };
            TaggedReview {
                review: s.review,
                sentiment: s.sentiment,
                noun_phrases,
                themes: theme_set,
            }
        })
        .collect();

    let themed = rows.iter().filter(|r| !r.themes.is_empty()).count();
    let report = aggregate::aggregate(&rows);

    info!(
        reviews = rows.len(),
        themed,
        banks = bank_keywords.len(),
        scorer = %scored.scorer,
        "Analysis complete"
    );

    Ok(Analysis {
        rows,
        bank_keywords,
        report,
        scorer: scored.scorer,
        fallback_reason: scored.fallback_reason,
    })
}

/// The JSON written by `analyze --report`.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub generated_at: String,
    pub reviews: usize,
    pub scorer: &'a str,
    pub fallback_reason: Option<&'a str>,
    pub bank_keywords: &'a BTreeMap<String, Vec<RankedKeyword>>,
    #[serde(flatten)]
    pub aggregate: &'a AggregateReport,
}

impl Analysis {
    pub fn json_report(&self) -> AnalysisReport<'_> {
        AnalysisReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            reviews: self.rows.len(),
            scorer: &self.scorer,
            fallback_reason: self.fallback_reason.as_deref(),
            bank_keywords: &self.bank_keywords,
            aggregate: &self.report,
        }
    }

    /// Write the keyword and aggregate views as pretty JSON.
    pub fn write_json_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.json_report())
            .context("Failed to serialize analysis report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote analysis report");
        Ok(())
    }
}
