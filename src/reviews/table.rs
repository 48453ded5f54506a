// CSV review tables: the input table from cleaning and the tagged output
// table handed to persistence.
//
// Output encoding:
//   noun_phrases: JSON array of strings, sorted
//   themes: pipe-delimited theme names, alphabetical
// Loading a written table reconstructs identical sets.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clean::{normalize_date, parse_rating};
use super::models::{Review, TaggedReview};
use crate::sentiment::labels::normalize_label;
use crate::sentiment::traits::SentimentResult;
use crate::themes::ThemeSet;

/// Column order of the tagged output table.
pub const OUTPUT_COLUMNS: [&str; 11] = [
    "review_id",
    "review",
    "rating",
    "date",
    "bank",
    "source",
    "sentiment_label",
    "sentiment_score",
    "model",
    "noun_phrases",
    "themes",
];

#[derive(Debug, Deserialize)]
struct InputRow {
    #[serde(default)]
    review_id: Option<u64>,
    #[serde(default)]
    review: Option<String>,
    rating: String,
    #[serde(default)]
    date: Option<String>,
    bank: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OutputRow {
    review_id: u64,
    review: String,
    rating: u8,
    date: Option<String>,
    bank: String,
    source: String,
    sentiment_label: String,
    sentiment_score: f64,
    model: String,
    noun_phrases: String,
    themes: String,
}

/// Load the canonical review table.
///
/// Ids in the file must be unique. When the file has no `review_id` column,
/// ids are assigned from the row position starting at 0; rows that leave the
/// id empty get fresh ids above the largest id in the file, in file order.
pub fn load_reviews(path: &Path) -> Result<Vec<Review>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open reviews: {}", path.display()))?;
    let mut reader = Reader::from_reader(file);

    let mut reviews = Vec::new();
    let mut file_ids: Vec<Option<u64>> = Vec::new();
    let mut seen: HashMap<u64, usize> = HashMap::new();
    for (i, result) in reader.deserialize().enumerate() {
        let line = i + 2;
        let row: InputRow =
            result.with_context(|| format!("Malformed review row on line {line}"))?;

        let rating = parse_rating(&row.rating).with_context(|| {
            format!("Invalid rating {:?} on line {line} (expected 1-5)", row.rating)
        })?;

        let date = match row.date.as_deref() {
            Some(raw) => {
                let parsed = normalize_date(raw);
                if parsed.is_none() {
                    warn!(line, date = raw, "Unparsable date in review table, using null");
                }
                parsed
            }
            None => None,
        };

        if let Some(id) = row.review_id {
            if let Some(first) = seen.insert(id, line) {
                anyhow::bail!("Duplicate review_id {id} on line {line} (first seen on line {first})");
            }
        }
        file_ids.push(row.review_id);

        reviews.push(Review {
            review_id: 0,
            review: row.review.unwrap_or_default(),
            rating,
            date,
            bank: row.bank,
            source: row.source.unwrap_or_default(),
        });
    }

    let mut next_id = seen.keys().max().map_or(0, |max| max + 1);
    for (review, id) in reviews.iter_mut().zip(file_ids) {
        review.review_id = match id {
            Some(id) => id,
            None => {
                let id = next_id;
                next_id += 1;
                id
            }
        };
    }

    info!(count = reviews.len(), path = %path.display(), "Loaded reviews");
    Ok(reviews)
}

/// Write the tagged output table.
pub fn write_tagged(path: &Path, rows: &[TaggedReview]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output table: {}", path.display()))?;
    let mut writer = Writer::from_writer(file);

    if rows.is_empty() {
        writer.write_record(OUTPUT_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(to_output_row(row)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a tagged output table written by `write_tagged`.
pub fn load_tagged(path: &Path) -> Result<Vec<TaggedReview>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open tagged reviews: {}", path.display()))?;
    let mut reader = Reader::from_reader(file);

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        let line = i + 2;
        let row: OutputRow =
            result.with_context(|| format!("Malformed tagged row on line {line}"))?;
        rows.push(from_output_row(row).with_context(|| format!("Bad tagged row on line {line}"))?);
    }
    Ok(rows)
}

fn to_output_row(row: &TaggedReview) -> Result<OutputRow> {
    let phrases: Vec<&String> = row.noun_phrases.iter().collect();
    Ok(OutputRow {
        review_id: row.review.review_id,
        review: row.review.review.clone(),
        rating: row.review.rating,
        date: row.review.date.map(|d| d.format("%Y-%m-%d").to_string()),
        bank: row.review.bank.clone(),
        source: row.review.source.clone(),
        sentiment_label: row.sentiment.label.to_string(),
        sentiment_score: row.sentiment.score,
        model: row.sentiment.model.clone(),
        noun_phrases: serde_json::to_string(&phrases)?,
        themes: row.themes.to_delimited(),
    })
}

fn from_output_row(row: OutputRow) -> Result<TaggedReview> {
    if !(1..=5).contains(&row.rating) {
        anyhow::bail!("Invalid rating {} (expected 1-5)", row.rating);
    }
    let date = match row.date.as_deref() {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid date {raw:?}"))?,
        ),
        None => None,
    };
    let noun_phrases: BTreeSet<String> = if row.noun_phrases.trim().is_empty() {
        BTreeSet::new()
    } else {
        serde_json::from_str(&row.noun_phrases).context("Invalid noun_phrases column")?
    };

    Ok(TaggedReview {
        review: Review {
            review_id: row.review_id,
            review: row.review,
            rating: row.rating,
            date,
            bank: row.bank,
            source: row.source,
        },
        sentiment: SentimentResult {
            label: normalize_label(&row.sentiment_label),
            score: row.sentiment_score,
            model: row.model,
        },
        noun_phrases,
        themes: ThemeSet::parse_delimited(&row.themes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::labels::SentimentLabel;

    #[test]
    fn test_load_reviews_assigns_ids_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        std::fs::write(
            &path,
            "review,rating,date,bank,source\n\
             Good,5,2024-03-01,Dashen Bank,Google Play\n\
             Bad,1,,Dashen Bank,Google Play\n",
        )
        .unwrap();

        let reviews = load_reviews(&path).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].review_id, 0);
        assert_eq!(reviews[1].review_id, 1);
        assert_eq!(reviews[0].date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(reviews[1].date, None);
    }

    #[test]
    fn test_load_reviews_keeps_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        std::fs::write(
            &path,
            "review_id,review,rating,date,bank,source\n\
             41,Good,5,2024-03-01,Dashen Bank,Google Play\n",
        )
        .unwrap();

        let reviews = load_reviews(&path).unwrap();
        assert_eq!(reviews[0].review_id, 41);
    }

    #[test]
    fn test_load_reviews_fills_missing_ids_above_file_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        std::fs::write(
            &path,
            "review_id,review,rating,date,bank,source\n\
             1,Good,5,,Dashen Bank,Google Play\n\
             ,Bad,1,,Dashen Bank,Google Play\n\
             ,Slow,2,,Dashen Bank,Google Play\n",
        )
        .unwrap();

        let ids: Vec<u64> = load_reviews(&path).unwrap().iter().map(|r| r.review_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_reviews_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        std::fs::write(
            &path,
            "review_id,review,rating,date,bank,source\n\
             4,Good,5,,Dashen Bank,Google Play\n\
             4,Bad,1,,Dashen Bank,Google Play\n",
        )
        .unwrap();

        let err = load_reviews(&path).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Duplicate review_id 4 on line 3"), "got: {msg}");
    }

    #[test]
    fn test_load_tagged_rejects_bad_rating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.csv");
        std::fs::write(
            &path,
            format!(
                "{}\n0,Fine,7,,BOA,Google Play,positive,0.5,vader,[],\n",
                OUTPUT_COLUMNS.join(",")
            ),
        )
        .unwrap();

        let err = load_tagged(&path).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("line 2") && msg.contains("Invalid rating 7"), "got: {msg}");
    }

    #[test]
    fn test_load_reviews_rejects_bad_rating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        std::fs::write(
            &path,
            "review,rating,date,bank,source\nGood,9,,Dashen Bank,Google Play\n",
        )
        .unwrap();

        let err = load_reviews(&path).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "got: {err:#}");
    }

    #[test]
    fn test_tagged_table_reload_preserves_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.csv");

        let row = TaggedReview {
            review: Review {
                review_id: 7,
                review: "The app crashes, \"always\" | after login".to_string(),
                rating: 2,
                date: NaiveDate::from_ymd_opt(2025, 1, 9),
                bank: "Commercial Bank of Ethiopia".to_string(),
                source: "Google Play".to_string(),
            },
            sentiment: SentimentResult {
                label: SentimentLabel::Negative,
                score: -0.42,
                model: "vader".to_string(),
            },
            noun_phrases: ["the app".to_string(), "login".to_string()].into(),
            themes: ThemeSet::from_iter([
                "Login / Access Issues".to_string(),
                "App Performance / Crashes".to_string(),
            ]),
        };
        let empty = TaggedReview {
            review: Review {
                review_id: 8,
                date: None,
                ..row.review.clone()
            },
            noun_phrases: BTreeSet::new(),
            themes: ThemeSet::default(),
            ..row.clone()
        };

        write_tagged(&path, &[row.clone(), empty]).unwrap();
        let loaded = load_tagged(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].review, row.review);
        assert_eq!(loaded[0].sentiment, row.sentiment);
        assert_eq!(loaded[0].noun_phrases, row.noun_phrases);
        assert_eq!(loaded[0].themes, row.themes);
        assert_eq!(loaded[1].review.date, None);
        assert!(loaded[1].noun_phrases.is_empty());
        assert!(loaded[1].themes.is_empty());
    }

    #[test]
    fn test_write_tagged_empty_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.csv");
        write_tagged(&path, &[]).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim_end(), OUTPUT_COLUMNS.join(","));
        assert!(load_tagged(&path).unwrap().is_empty());
    }
}
