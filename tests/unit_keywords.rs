// Unit tests for keyword ranking, noun phrases, and theme tagging.
//
// Tests the edge cases of each extractor in isolation: empty groups,
// repeated documents, deterministic ordering, and substring matching.

use reviewlens::keywords::phrases::NounPhraseChunker;
use reviewlens::keywords::tfidf::{bank_keywords, rank_keywords, TfIdfParams};
use reviewlens::keywords::traits::PhraseExtractor;
use reviewlens::reviews::models::Review;
use reviewlens::themes::lexicon::ThemeLexicon;

// ============================================================
// TF-IDF ranking
// ============================================================

#[test]
fn single_repeated_document_ranks_its_most_frequent_term_first() {
    let docs = vec!["payment payment payment fingerprint"; 3];
    let ranked = rank_keywords(&docs, &TfIdfParams::default());
    assert_eq!(ranked[0].term, "payment");
}

#[test]
fn empty_group_yields_empty_keywords() {
    let docs: Vec<&str> = Vec::new();
    assert!(rank_keywords(&docs, &TfIdfParams::default()).is_empty());
}

#[test]
fn ranking_is_deterministic() {
    let docs = vec![
        "transfer payment slow",
        "payment biometric",
        "transfer network",
        "biometric login network",
    ];
    let a = rank_keywords(&docs, &TfIdfParams::default());
    let b = rank_keywords(&docs, &TfIdfParams::default());
    assert_eq!(a, b);
}

#[test]
fn keyword_groups_are_independent() {
    let review = |bank: &str, text: &str| Review {
        review_id: 0,
        review: text.to_string(),
        rating: 4,
        date: None,
        bank: bank.to_string(),
        source: "Google Play".to_string(),
    };
    let rows = vec![review("A", "fingerprint fingerprint"), review("B", "payment")];
    let keywords = bank_keywords(&rows, &TfIdfParams::default());
    assert_eq!(keywords["A"].len(), 2); // "fingerprint", "fingerprint fingerprint"
    assert_eq!(keywords["B"].len(), 1);
    assert_eq!(keywords["B"][0].term, "payment");
}

// ============================================================
// Noun phrases
// ============================================================

#[test]
fn noun_phrases_are_lowercased_sets() {
    let chunker = NounPhraseChunker::new();
    let phrases = chunker.extract("The Mobile App needs a QR payment option");
    assert!(phrases.iter().all(|p| p == &p.to_lowercase()));
    assert!(phrases.contains("the mobile app"));
    assert!(phrases.contains("a qr payment option"));
}

#[test]
fn empty_text_has_no_noun_phrases() {
    assert!(NounPhraseChunker::new().extract("").is_empty());
}

// ============================================================
// Theme tagging
// ============================================================

#[test]
fn crash_review_tags_performance() {
    let themes = ThemeLexicon::reference().tag("the app crashes and freezes");
    assert!(themes.contains("App Performance / Crashes"));
    assert_eq!(themes.len(), 1);
}

#[test]
fn multiple_themes_are_sorted_and_unique() {
    let themes = ThemeLexicon::reference()
        .tag("Login error after the payment, then login fail again and another transfer");
    assert_eq!(
        themes.iter().collect::<Vec<_>>(),
        vec!["Login / Access Issues", "Transactions / Transfers"]
    );
    assert_eq!(themes.to_delimited(), "Login / Access Issues|Transactions / Transfers");
}

#[test]
fn trigger_inside_longer_word_still_matches() {
    let themes = ThemeLexicon::reference().tag("spinning");
    assert!(themes.contains("Login / Access Issues"));
}
