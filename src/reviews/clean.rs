// Cleaning: raw scraped rows to the canonical review table.
//
// Drops rows missing a review or a usable rating, normalizes dates to plain
// calendar dates, removes duplicates on (review, rating, bank), and projects
// to the canonical column order.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A row as produced by ingestion. Every column may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A row of the canonical review table (before a review_id is assigned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanReview {
    pub review: String,
    pub rating: u8,
    pub date: Option<NaiveDate>,
    pub bank: String,
    pub source: String,
}

/// Row counts collected while cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub initial: usize,
    pub missing_dropped: usize,
    pub duplicates_removed: usize,
    pub final_rows: usize,
    /// Rows kept with a null date (missing or unparsable)
    pub missing_date: usize,
}

/// Clean a batch of raw rows. Row order is preserved; the first occurrence
/// of a duplicate wins.
pub fn clean_reviews(raw: Vec<RawReview>) -> (Vec<CleanReview>, CleanStats) {
    let mut stats = CleanStats {
        initial: raw.len(),
        ..Default::default()
    };

    let mut seen: HashSet<(String, u8, String)> = HashSet::new();
    let mut cleaned = Vec::with_capacity(raw.len());

    for row in raw {
        let review = match row.review.filter(|r| !r.is_empty()) {
            Some(r) => r,
            None => {
                stats.missing_dropped += 1;
                continue;
            }
        };
        let rating = match row.rating.as_deref().and_then(parse_rating) {
            Some(r) => r,
            None => {
                stats.missing_dropped += 1;
                continue;
            }
        };
        let bank = match row.bank.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()) {
            Some(b) => b,
            None => {
                stats.missing_dropped += 1;
                continue;
            }
        };

        if !seen.insert((review.clone(), rating, bank.clone())) {
            stats.duplicates_removed += 1;
            continue;
        }

        let date = row.date.as_deref().and_then(normalize_date);
        if date.is_none() {
            stats.missing_date += 1;
        }

        cleaned.push(CleanReview {
            review,
            rating,
            date,
            bank,
            source: row.source.unwrap_or_default().trim().to_string(),
        });
    }

    stats.final_rows = cleaned.len();
    (cleaned, stats)
}

/// Read a raw CSV, clean it, and write the canonical table.
pub fn clean_file(input: &Path, output: &Path) -> Result<CleanStats> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open raw reviews: {}", input.display()))?;
    let mut reader = Reader::from_reader(file);

    let mut raw = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        // +2: header line plus 1-based numbering
        let row: RawReview =
            result.with_context(|| format!("Malformed raw review on line {}", i + 2))?;
        raw.push(row);
    }

    let (cleaned, stats) = clean_reviews(raw);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let file = File::create(output)
        .with_context(|| format!("Failed to create clean reviews: {}", output.display()))?;
    let mut writer = Writer::from_writer(file);
    if cleaned.is_empty() {
        writer.write_record(["review", "rating", "date", "bank", "source"])?;
    }
    for row in &cleaned {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(
        initial = stats.initial,
        dropped = stats.missing_dropped,
        duplicates = stats.duplicates_removed,
        kept = stats.final_rows,
        "Cleaned review table"
    );
    Ok(stats)
}

/// Parse a star rating. Accepts "4" and "4.0" (pandas writes floats when a
/// column had gaps); anything outside 1–5 or fractional is rejected.
pub fn parse_rating(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return None;
    }
    Some(value as u8)
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
];

/// Normalize a source date string to a calendar date.
/// Returns None for anything unparsable; never fails.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }

    debug!(date = raw, "Unparsable review date, storing null");
    None
}
