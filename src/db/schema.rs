// Database schema: table creation and migrations.
//
// A `schema_version` table tracks which migrations have run, and each
// migration is a function that executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent: safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS banks (
            bank_id INTEGER PRIMARY KEY AUTOINCREMENT,
            bank_name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per analyzed review; review_id is unique within a bank
        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id INTEGER NOT NULL,
            bank_id INTEGER NOT NULL REFERENCES banks(bank_id),
            review_text TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            review_date TEXT,                  -- YYYY-MM-DD, null if unknown
            source TEXT NOT NULL,
            sentiment_label TEXT NOT NULL,
            sentiment_score REAL NOT NULL,
            model TEXT NOT NULL,               -- scorer that produced the label
            noun_phrases TEXT NOT NULL DEFAULT '[]',  -- JSON array
            themes TEXT NOT NULL DEFAULT '',   -- pipe-delimited, alphabetical
            inserted_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (bank_id, review_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_bank
            ON reviews(bank_id);

        CREATE INDEX IF NOT EXISTS idx_reviews_label
            ON reviews(sentiment_label);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: store the store-listing app name next to each bank.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE banks ADD COLUMN app_name TEXT;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let tables: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(tables, vec!["banks", "reviews", "schema_version"]);
    }

    #[test]
    fn test_rating_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute("INSERT INTO banks (bank_name) VALUES ('BOA')", [])
            .unwrap();

        let result = conn.execute(
            "INSERT INTO reviews (review_id, bank_id, review_text, rating, source,
                                  sentiment_label, sentiment_score, model)
             VALUES (1, 1, 'x', 9, 'Google Play', 'neutral', 0.0, 'vader')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_migration_v2_adds_app_name() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO banks (bank_name, app_name) VALUES ('CBE', 'CBE Birr')",
            [],
        )
        .unwrap();
        let app: String = conn
            .query_row("SELECT app_name FROM banks WHERE bank_name = 'CBE'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(app, "CBE Birr");
    }
}
