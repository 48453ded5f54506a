// Rule-based noun-phrase chunker.
//
// Approximates a tagger-driven chunker with closed-class word lists and a few
// suffix rules. A chunk is an optional determiner, any number of adjectives
// or numbers, and one or more nouns ("the new update", "transfer fee").
// Personal pronouns are chunks of their own. Any word not recognised as a
// function word, verb, adverb, or adjective is taken to be a noun.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::traits::PhraseExtractor;

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:'\p{L}+)?|[^\s\p{L}\p{N}]").expect("valid word pattern")
});

fn word_set(words: &[&'static str]) -> HashSet<&'static str> {
    words.iter().copied().collect()
}

static DETERMINERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    word_set(&[
        "a", "an", "the", "this", "that", "these", "those", "my", "your", "his", "her", "its",
        "our", "their", "some", "any", "no", "every", "each", "all", "both", "either", "neither",
        "another", "such", "what", "which", "whose", "much", "many", "few", "several", "more",
        "most", "other",
    ])
});

/// Determiners that stand alone as a chunk when nothing nominal follows.
static DEMONSTRATIVES: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| word_set(&["this", "that", "these", "those"]));

static PRONOUNS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    word_set(&[
        "i", "me", "you", "he", "him", "she", "it", "we", "us", "they", "them", "myself",
        "yourself", "himself", "herself", "itself", "ourselves", "themselves", "everyone",
        "everything", "someone", "something", "anyone", "anything", "nothing", "nobody",
        "everybody", "somebody", "anybody", "mine", "yours", "ours", "theirs",
    ])
});

/// Words that end a chunk: prepositions, conjunctions, auxiliaries, common
/// verbs, adverbs, and interjections.
static BREAKERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    word_set(&[
        // prepositions
        "about", "above", "across", "after", "against", "along", "among", "around", "as", "at",
        "before", "behind", "below", "beside", "between", "beyond", "by", "despite", "down",
        "during", "except", "for", "from", "in", "inside", "into", "like", "near", "of", "off",
        "on", "onto", "out", "outside", "over", "past", "since", "through", "throughout", "to",
        "toward", "towards", "under", "until", "up", "upon", "via", "with", "within", "without",
        // conjunctions and relatives
        "and", "or", "but", "nor", "so", "yet", "because", "although", "though", "while",
        "whereas", "if", "unless", "whether", "than", "when", "where", "why", "how", "who",
        "whom", "then", "once",
        // auxiliaries and copulas
        "am", "is", "are", "was", "were", "be", "been", "being", "do", "does", "did", "done",
        "have", "has", "had", "having", "will", "would", "shall", "should", "can", "could",
        "may", "might", "must", "cannot", "can't", "don't", "doesn't", "didn't", "won't",
        "isn't", "aren't", "wasn't", "weren't", "haven't", "hasn't", "hadn't", "couldn't",
        "wouldn't", "shouldn't", "i'm", "it's", "i've", "i'd", "i'll", "you're", "they're",
        "we're", "that's", "there's",
        // common verbs
        "get", "gets", "got", "make", "makes", "made", "go", "goes", "went", "gone", "uses",
        "used", "works", "worked", "complete", "completed", "open", "opens", "opened", "try",
        "tried", "tries", "keep", "keeps", "kept", "need", "needs", "needed", "want", "wants", "wanted",
        "say", "says", "said", "see", "saw", "seen", "know", "knew", "think", "thought", "take",
        "took", "taken", "give", "gave", "given", "let", "lets", "love", "loves", "loved",
        "hate", "hates", "hated", "like", "likes", "liked", "fix", "fixed", "please", "show",
        "shows", "showed", "stop", "stops", "stopped", "crashes", "crashed", "freezes", "froze",
        "fails", "failed", "become", "becomes", "became", "send", "sends", "sent", "receive",
        "received", "paid", "checked", "downloaded", "install", "installed", "updated", "allow",
        "allows", "allowed", "add", "added", "improve", "improved", "helps", "helped", "wait",
        "waited", "enter", "entered",
        // adverbs and interjections
        "not", "very", "too", "also", "just", "only", "even", "still", "really", "always",
        "never", "ever", "again", "already", "now", "here", "there", "well", "almost", "quite",
        "rather", "often", "sometimes", "soon", "yes", "no", "ok", "okay", "wow", "oh",
        "please", "thanks", "thank", "hi", "hello",
    ])
});

static ADJECTIVES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    word_set(&[
        "good", "great", "bad", "best", "worst", "better", "worse", "nice", "new", "old",
        "easy", "hard", "fast", "slow", "simple", "poor", "excellent", "amazing", "awesome",
        "terrible", "horrible", "awful", "fine", "smooth", "quick", "big", "small", "long",
        "short", "high", "low", "first", "last", "latest", "recent", "main", "whole", "same",
        "different", "full", "free", "online", "mobile", "digital", "secure", "safe", "friendly",
        "convenient", "reliable", "stable", "simple", "modern", "perfect", "nice", "cool",
        "clean", "clear", "wrong", "right", "real", "true", "fake", "able", "unable", "frequent",
        "constant", "annoying", "disappointing", "frustrating", "outstanding",
    ])
});

const ADJECTIVE_SUFFIXES: [&str; 6] = ["ful", "less", "ous", "ive", "able", "ible"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Det,
    Pron,
    Adj,
    Num,
    Noun,
    Break,
}

fn classify(word: &str) -> Tag {
    if word.chars().all(|c| c.is_ascii_digit()) {
        return Tag::Num;
    }
    if !word.chars().any(|c| c.is_alphanumeric()) {
        return Tag::Break;
    }
    if PRONOUNS.contains(word) {
        return Tag::Pron;
    }
    if DETERMINERS.contains(word) {
        return Tag::Det;
    }
    if BREAKERS.contains(word) {
        return Tag::Break;
    }
    if ADJECTIVES.contains(word) {
        return Tag::Adj;
    }
    if word.contains('\'') {
        // Possessive nouns are handled by the caller; other contractions break.
        return Tag::Break;
    }
    if word.len() > 4 && word.ends_with("ly") {
        return Tag::Break;
    }
    if word.len() > 5 && ADJECTIVE_SUFFIXES.iter().any(|s| word.ends_with(s)) {
        return Tag::Adj;
    }
    Tag::Noun
}

/// Heuristic noun-phrase chunker. Stateless and cheap to construct.
#[derive(Debug, Default, Clone, Copy)]
pub struct NounPhraseChunker;

impl NounPhraseChunker {
    pub fn new() -> Self {
        Self
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut chunks = Vec::new();
        let mut current = Chunk::default();

        for m in WORD_PATTERN.find_iter(&lower) {
            let token = m.as_str();

            // "bank's app": the possessor closes one chunk and the owner opens the next
            if let Some(stem) = token.strip_suffix("'s") {
                if classify(stem) == Tag::Noun {
                    current.push(stem, Tag::Noun);
                    current.flush_into(&mut chunks);
                    continue;
                }
            }

            match classify(token) {
                Tag::Det => {
                    current.flush_into(&mut chunks);
                    current.push(token, Tag::Det);
                }
                Tag::Adj | Tag::Num => {
                    if current.has_noun {
                        current.flush_into(&mut chunks);
                    }
                    current.push(token, classify(token));
                }
                Tag::Noun => current.push(token, Tag::Noun),
                Tag::Pron => {
                    current.flush_into(&mut chunks);
                    chunks.push(token.to_string());
                }
                Tag::Break => current.flush_into(&mut chunks),
            }
        }
        current.flush_into(&mut chunks);

        chunks
    }
}

#[derive(Debug, Default)]
struct Chunk<'a> {
    words: Vec<&'a str>,
    has_noun: bool,
}

impl<'a> Chunk<'a> {
    fn push(&mut self, word: &'a str, tag: Tag) {
        if tag == Tag::Noun {
            self.has_noun = true;
        }
        self.words.push(word);
    }

    fn flush_into(&mut self, out: &mut Vec<String>) {
        if self.has_noun {
            out.push(self.words.join(" "));
        } else if let [word] = self.words.as_slice() {
            if DEMONSTRATIVES.contains(*word) {
                out.push(word.to_string());
            }
        }
        self.words.clear();
        self.has_noun = false;
    }
}

impl PhraseExtractor for NounPhraseChunker {
    fn extract(&self, text: &str) -> BTreeSet<String> {
        self.chunks(text).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> BTreeSet<String> {
        NounPhraseChunker::new().extract(text)
    }

    #[test]
    fn test_empty_text() {
        assert!(extract("").is_empty());
        assert!(extract("   ").is_empty());
        assert!(extract("!!! ...").is_empty());
    }

    #[test]
    fn test_determiner_adjective_noun() {
        let phrases = extract("The new update is slow.");
        assert!(phrases.contains("the new update"), "got {phrases:?}");
    }

    #[test]
    fn test_compound_nouns_and_pronouns() {
        let phrases = extract("I cannot complete a money transfer with this app");
        assert!(phrases.contains("i"));
        assert!(phrases.contains("a money transfer"));
        assert!(phrases.contains("this app"));
    }

    #[test]
    fn test_lowercased_and_deduplicated() {
        let phrases = extract("App crashes. APP crashes again.");
        assert_eq!(phrases.into_iter().collect::<Vec<_>>(), vec!["app"]);
    }

    #[test]
    fn test_possessive_splits_chunks() {
        let phrases = extract("the bank's support team");
        assert!(phrases.contains("the bank"));
        assert!(phrases.contains("support team"));
    }

    #[test]
    fn test_adjective_after_noun_starts_new_chunk() {
        let phrases = extract("login screen great design");
        assert!(phrases.contains("login screen"));
        assert!(phrases.contains("great design"));
    }

    #[test]
    fn test_accented_words_stay_whole() {
        let phrases = extract("The café menu is great");
        assert!(phrases.contains("the café menu"), "got {phrases:?}");
    }

    #[test]
    fn test_no_noun_phrase() {
        assert!(extract("very very good").is_empty());
    }

    #[test]
    fn test_demonstrative_stands_alone() {
        let phrases = extract("This is terrible");
        assert!(phrases.contains("this"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("the"), Tag::Det);
        assert_eq!(classify("it"), Tag::Pron);
        assert_eq!(classify("quickly"), Tag::Break);
        assert_eq!(classify("useless"), Tag::Adj);
        assert_eq!(classify("42"), Tag::Num);
        assert_eq!(classify("fingerprint"), Tag::Noun);
    }
}
