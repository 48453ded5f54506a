// Database queries: every SQL statement the app runs lives here.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::reviews::models::TaggedReview;

// --- Banks ---

/// Insert a bank if it is new and return its id either way.
pub fn upsert_bank(conn: &Connection, bank_name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO banks (bank_name) VALUES (?1)
         ON CONFLICT(bank_name) DO NOTHING",
        params![bank_name],
    )?;
    let bank_id = conn
        .query_row(
            "SELECT bank_id FROM banks WHERE bank_name = ?1",
            params![bank_name],
            |row| row.get(0),
        )
        .with_context(|| format!("Bank {bank_name:?} missing after insert"))?;
    Ok(bank_id)
}

// --- Reviews ---

/// Save or update one analyzed review, keyed by (bank_id, review_id).
pub fn upsert_review(conn: &Connection, bank_id: i64, row: &TaggedReview) -> Result<()> {
    let noun_phrases = serde_json::to_string(&row.noun_phrases)?;
    let review_date = row.review.date.map(|d| d.format("%Y-%m-%d").to_string());
    conn.execute(
        "INSERT INTO reviews (review_id, bank_id, review_text, rating, review_date, source,
                              sentiment_label, sentiment_score, model, noun_phrases, themes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(bank_id, review_id) DO UPDATE SET
            review_text = ?3,
            rating = ?4,
            review_date = ?5,
            source = ?6,
            sentiment_label = ?7,
            sentiment_score = ?8,
            model = ?9,
            noun_phrases = ?10,
            themes = ?11,
            inserted_at = datetime('now')",
        params![
            row.review.review_id as i64,
            bank_id,
            row.review.review,
            row.review.rating,
            review_date,
            row.review.source,
            row.sentiment.label.as_str(),
            row.sentiment.score,
            row.sentiment.model,
            noun_phrases,
            row.themes.to_delimited(),
        ],
    )?;
    Ok(())
}

/// Stored review counts per bank, alphabetical by bank name.
pub fn review_counts_by_bank(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT b.bank_name, COUNT(r.id)
         FROM banks b
         LEFT JOIN reviews r ON r.bank_id = b.bank_id
         GROUP BY b.bank_id
         ORDER BY b.bank_name",
    )?;
    let counts = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(counts)
}

/// Stored review counts per sentiment label.
pub fn label_counts(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT sentiment_label, COUNT(*) FROM reviews
         GROUP BY sentiment_label
         ORDER BY sentiment_label",
    )?;
    let counts = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(counts)
}

pub fn review_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
    Ok(count)
}
