// Keyword extraction: per-bank TF-IDF rankings and per-review noun phrases.

pub mod phrases;
pub mod tfidf;
pub mod traits;
