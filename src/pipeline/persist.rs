// Persistence pipeline: write the tagged review table into SQLite.
//
// Banks are upserted once each and their ids cached for the run. All rows
// go in through a single transaction, so a failure leaves the database as
// it was.

use std::collections::HashMap;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::info;

use crate::db::queries;
use crate::reviews::models::TaggedReview;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub banks: usize,
    pub reviews: usize,
}

pub fn run(conn: &mut Connection, rows: &[TaggedReview]) -> Result<PersistStats> {
    let tx = conn.transaction().context("Failed to start transaction")?;
    let mut bank_ids: HashMap<&str, i64> = HashMap::new();

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Persisting [{bar:30}] {pos}/{len} ({eta})")
            .expect("valid template"),
    );

    for row in rows {
        let bank = row.review.bank.as_str();
        let bank_id = match bank_ids.get(bank) {
            Some(&id) => id,
            None => {
                let id = queries::upsert_bank(&tx, bank)?;
                bank_ids.insert(bank, id);
                id
            }
        };
        queries::upsert_review(&tx, bank_id, row).with_context(|| {
            format!(
                "Failed to store review {} for {}",
                row.review.review_id, row.review.bank
            )
        })?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    tx.commit().context("Failed to commit reviews")?;

    let stats = PersistStats {
        banks: bank_ids.len(),
        reviews: rows.len(),
    };
    info!(banks = stats.banks, reviews = stats.reviews, "Persisted reviews");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::reviews::models::Review;
    use crate::sentiment::traits::SentimentResult;

    fn row(id: u64, bank: &str, rating: u8) -> TaggedReview {
        TaggedReview {
            review: Review {
                review_id: id,
                review: "works".to_string(),
                rating,
                date: None,
                bank: bank.to_string(),
                source: "Google Play".to_string(),
            },
            sentiment: SentimentResult::skipped(),
            noun_phrases: Default::default(),
            themes: Default::default(),
        }
    }

    #[test]
    fn test_persist_groups_banks() {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();

        let rows = vec![row(0, "BOA", 5), row(1, "CBE", 4), row(2, "BOA", 3)];
        let stats = run(&mut conn, &rows).unwrap();

        assert_eq!(stats, PersistStats { banks: 2, reviews: 3 });
        assert_eq!(
            queries::review_counts_by_bank(&conn).unwrap(),
            vec![("BOA".to_string(), 2), ("CBE".to_string(), 1)]
        );
    }

    #[test]
    fn test_persist_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();

        let rows = vec![row(0, "BOA", 5), row(1, "BOA", 2)];
        run(&mut conn, &rows).unwrap();
        run(&mut conn, &rows).unwrap();
        assert_eq!(queries::review_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_failed_row_rolls_back_everything() {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();

        // Rating 9 violates the CHECK constraint
        let rows = vec![row(0, "BOA", 5), row(1, "BOA", 9)];
        assert!(run(&mut conn, &rows).is_err());
        assert_eq!(queries::review_count(&conn).unwrap(), 0);
        assert!(queries::review_counts_by_bank(&conn).unwrap().is_empty());
    }
}
