// Review records and the tables they travel in.
//
// `models` holds the row types each stage produces, `table` reads and writes
// the canonical CSV tables, and `clean` turns raw scraped rows into the
// canonical input table.

pub mod clean;
pub mod models;
pub mod table;
