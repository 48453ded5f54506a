// Theme lexicon and tagger.
//
// A theme matches when any of its trigger phrases occurs anywhere in the
// lower-cased review text. Matching is plain substring containment, so a
// trigger inside a longer word still counts ("pin" matches "spinning").

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use tracing::info;

use super::{ThemeSet, THEME_DELIMITER};

static REFERENCE: LazyLock<ThemeLexicon> = LazyLock::new(|| {
    let entries: [(&str, &[&str]); 5] = [
        (
            "Login / Access Issues",
            &[
                "login",
                "password",
                "pin",
                "cannot login",
                "authenticate",
                "login fail",
                "login error",
            ],
        ),
        (
            "App Performance / Crashes",
            &["slow", "crash", "freezes", "stopped", "timeout", "lag", "force close"],
        ),
        (
            "Transactions / Transfers",
            &[
                "transfer",
                "payment",
                "transaction failed",
                "network error",
                "processing",
                "send money",
            ],
        ),
        (
            "UI / UX",
            &["user friendly", "ui", "easy to use", "navigation", "good design", "experience"],
        ),
        (
            "Feature Requests / Suggestions",
            &["fingerprint", "biometric", "offline", "feature", "qr", "notification"],
        ),
    ];

    ThemeLexicon {
        themes: entries
            .iter()
            .map(|(name, triggers)| {
                (
                    name.to_string(),
                    triggers.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect(),
    }
});

/// Theme name to trigger phrases. Triggers are stored lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeLexicon {
    themes: BTreeMap<String, Vec<String>>,
}

impl ThemeLexicon {
    /// The five built-in banking themes.
    pub fn reference() -> &'static ThemeLexicon {
        &REFERENCE
    }

    /// Build a lexicon from a theme map, validating names and triggers.
    pub fn new(themes: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut validated = BTreeMap::new();
        for (name, triggers) in themes {
            let name = name.trim().to_string();
            if name.is_empty() {
                anyhow::bail!("Theme lexicon contains an empty theme name");
            }
            if name.contains(THEME_DELIMITER) {
                anyhow::bail!("Theme name {name:?} contains the reserved '{THEME_DELIMITER}' character");
            }
            if triggers.iter().any(|t| t.trim().is_empty()) {
                anyhow::bail!("Theme {name:?} has an empty trigger phrase");
            }
            let triggers = triggers.into_iter().map(|t| t.to_lowercase()).collect();
            validated.insert(name, triggers);
        }
        Ok(Self { themes: validated })
    }

    /// Load a lexicon from a JSON object of `{"Theme": ["trigger", ...]}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme lexicon {}", path.display()))?;
        let themes: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse theme lexicon {}", path.display()))?;
        let lexicon = Self::new(themes)?;
        info!(
            themes = lexicon.themes.len(),
            path = %path.display(),
            "Loaded theme lexicon"
        );
        Ok(lexicon)
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn triggers(&self, theme: &str) -> Option<&[String]> {
        self.themes.get(theme).map(Vec::as_slice)
    }

    /// Themes with at least one trigger phrase in `text`. Never fails.
    pub fn tag(&self, text: &str) -> ThemeSet {
        if text.trim().is_empty() {
            return ThemeSet::default();
        }
        let lower = text.to_lowercase();
        self.themes
            .iter()
            .filter(|(_, triggers)| triggers.iter().any(|t| lower.contains(t.as_str())))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
