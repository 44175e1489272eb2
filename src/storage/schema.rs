//! Database schema for the SQLite output

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per review, payload is the review as JSON
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    album_count INTEGER NOT NULL
);
"#;

/// Creates the tables if they do not exist yet
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema is in place
/// * `Err(rusqlite::Error)` - Failed to create the schema
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
