// Theme tagging: a fixed lexicon of trigger phrases per complaint or
// feature theme, matched by case-insensitive substring containment.

pub mod lexicon;

use std::collections::BTreeSet;

/// Separator between theme names in the serialized `themes` column.
pub const THEME_DELIMITER: char = '|';

/// The themes attached to one review. Deduplicated and ordered
/// alphabetically, so serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThemeSet(BTreeSet<String>);

impl ThemeSet {
    pub fn contains(&self, theme: &str) -> bool {
        self.0.contains(theme)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pipe-delimited, alphabetical. Empty set gives an empty string.
    pub fn to_delimited(&self) -> String {
        self.iter().collect::<Vec<_>>().join("|")
    }

    /// Inverse of [`ThemeSet::to_delimited`]; empty segments are ignored.
    pub fn parse_delimited(raw: &str) -> Self {
        raw.split(THEME_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl FromIterator<String> for ThemeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        ThemeSet(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for ThemeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        ThemeSet(iter.into_iter().map(str::to_string).collect())
    }
}
