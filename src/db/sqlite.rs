use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

const SCHEMA: &str = include_str!("../../resources/schema.sql");

/// Open a SQLite connection to the given path and create the schema if needed.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::ConstraintViolation(format!("Cannot create database directory: {e}"))
        })?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Create all tables and indexes. Safe to run on an existing database.
pub fn ensure_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
