use rusqlite::Connection;

use crate::error::FetchError;

pub fn initialize_schema(conn: &Connection) -> Result<(), FetchError> {
    conn.execute_batch("
        PRAGMA journal_mode = WAL;

        -- One row per remote message id. timestamp = 0 until hydrated.
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT UNIQUE,
            [from]          TEXT DEFAULT '',
            delivered_to    TEXT DEFAULT '',
            subject         TEXT DEFAULT '',
            timestamp       INTEGER DEFAULT 0,
            labels          TEXT DEFAULT ''     -- label codec field
        );

        CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
    ")?;

    // Migrations for existing catalogs
    // Add labels column to catalogs created before it existed
    add_column(conn, "ALTER TABLE messages ADD COLUMN labels TEXT DEFAULT '';")?;

    Ok(())
}

/// Run an `ADD COLUMN` migration, tolerating only an already present column
fn add_column(conn: &Connection, sql: &str) -> Result<(), FetchError> {
    match conn.execute_batch(sql) {
        Ok(()) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
            if msg.starts_with("duplicate column name") =>
        {
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_column_tolerates_existing_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT);").unwrap();

        add_column(&conn, "ALTER TABLE t ADD COLUMN b TEXT;").unwrap();
        add_column(&conn, "ALTER TABLE t ADD COLUMN b TEXT;").unwrap();
    }

    #[test]
    fn test_add_column_propagates_other_failures() {
        let conn = Connection::open_in_memory().unwrap();

        let result = add_column(&conn, "ALTER TABLE missing ADD COLUMN b TEXT;");
        assert!(matches!(result, Err(FetchError::StorageUnavailable(_))));
    }

    #[test]
    fn test_initialize_schema_twice() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
    }
}
