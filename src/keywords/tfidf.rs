// TF-IDF keyword ranking, one corpus per bank.
//
// Each review is a document. Terms are lower-cased word tokens of two or more
// word characters with English stop words removed, plus the bigrams formed
// from adjacent surviving tokens. The vocabulary is capped at the
// `max_features` most frequent terms across the corpus. Document vectors use
// raw counts times smoothed IDF and are L2-normalized; a term's keyword score
// is its mean weight over all documents in the group.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};
use tracing::{debug, info};

use crate::reviews::models::Review;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"));

static STOP_WORDS: LazyLock<HashSet<String>> =
    LazyLock::new(|| get(LANGUAGE::English).into_iter().collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfIdfParams {
    /// Vocabulary cap per bank corpus
    pub max_features: usize,
    /// Keywords reported per bank
    pub top_n: usize,
}

impl Default for TfIdfParams {
    fn default() -> Self {
        Self {
            max_features: 2000,
            top_n: 10,
        }
    }
}

/// A keyword and its mean TF-IDF weight within one bank's reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub term: String,
    pub score: f64,
}

/// Split a document into its unigram and bigram terms.
pub fn analyze(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !STOP_WORDS.contains(*t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

/// Rank the terms of a corpus by mean TF-IDF weight, highest first.
///
/// Ties break on the term, lexically. A corpus with no usable terms
/// (empty, or nothing but stop words) yields an empty ranking.
pub fn rank_keywords<S: AsRef<str>>(docs: &[S], params: &TfIdfParams) -> Vec<RankedKeyword> {
    if docs.is_empty() || params.top_n == 0 {
        return Vec::new();
    }

    let analyzed: Vec<Vec<String>> = docs.iter().map(|d| analyze(d.as_ref())).collect();

    let mut corpus_freq: HashMap<&str, usize> = HashMap::new();
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for terms in &analyzed {
        let mut seen: HashSet<&str> = HashSet::new();
        for term in terms {
            *corpus_freq.entry(term.as_str()).or_insert(0) += 1;
            if seen.insert(term.as_str()) {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }
    }

    if corpus_freq.is_empty() {
        debug!(docs = docs.len(), "No terms left after stop-word removal");
        return Vec::new();
    }

    let mut by_frequency: Vec<(&str, usize)> = corpus_freq.into_iter().collect();
    by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    by_frequency.truncate(params.max_features);
    let vocabulary: HashSet<&str> = by_frequency.iter().map(|(t, _)| *t).collect();

    let n_docs = docs.len() as f64;
    let idf = |term: &str| -> f64 {
        let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
    };

    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for terms in &analyzed {
        let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
        for term in terms.iter().filter(|t| vocabulary.contains(t.as_str())) {
            *counts.entry(term.as_str()).or_insert(0.0) += 1.0;
        }

        let weights: Vec<(&str, f64)> = counts
            .into_iter()
            .map(|(term, count)| (term, count * idf(term)))
            .collect();
        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        for (term, weight) in weights {
            *totals.entry(term).or_insert(0.0) += weight / norm;
        }
    }

    let mut ranked: Vec<RankedKeyword> = totals
        .into_iter()
        .map(|(term, total)| RankedKeyword {
            term: term.to_string(),
            score: total / n_docs,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.term.cmp(&b.term))
    });
    ranked.truncate(params.top_n);
    ranked
}

/// Top keywords for every bank present in `rows`.
///
/// Blank reviews are left out of their bank's corpus. A bank whose reviews
/// are all blank still appears, with an empty ranking.
pub fn bank_keywords<'a>(
    rows: impl IntoIterator<Item = &'a Review>,
    params: &TfIdfParams,
) -> BTreeMap<String, Vec<RankedKeyword>> {
    let mut corpora: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for row in rows {
        let corpus = corpora.entry(row.bank.clone()).or_default();
        if row.has_text() {
            corpus.push(row.review.as_str());
        }
    }

    corpora
        .into_iter()
        .map(|(bank, docs)| {
            let ranked = rank_keywords(&docs, params);
            info!(
                bank = %bank,
                docs = docs.len(),
                top_keyword = ranked.first().map(|k| k.term.as_str()).unwrap_or(""),
                "Ranked bank keywords"
            );
            (bank, ranked)
        })
        .collect()
}
