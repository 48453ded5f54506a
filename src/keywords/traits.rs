// Phrase extractor trait.
//
// Noun-phrase chunking needs a part-of-speech model to be exact. The trait
// keeps the pipeline independent of which chunker is plugged in.

use std::collections::BTreeSet;

/// Trait for pulling noun phrases out of a single review.
pub trait PhraseExtractor: Send + Sync {
    /// Lower-cased noun phrases found in `text`. Empty text yields an empty set.
    fn extract(&self, text: &str) -> BTreeSet<String>;
}
