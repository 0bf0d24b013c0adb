//! Schema migrations for the outcome database.
//!
//! Migrations are versioned and applied when the database is opened. The
//! `schema_version` table holds the single current version row.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version after all migrations have run.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations.
///
/// # Errors
/// Returns an error if a migration statement fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = schema_version(conn)?;
    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: show log, outcome log and the key-value table.
///
/// `seq` gives insertion order independent of clock skew between writers.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS shows (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            session_id    TEXT NOT NULL,
            target_app    TEXT NOT NULL,
            kind          TEXT NOT NULL,
            category      INTEGER NOT NULL,
            instance_id   TEXT NOT NULL,
            friction_tier INTEGER NOT NULL,
            context       TEXT NOT NULL,
            shown_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS outcomes (
            seq              INTEGER PRIMARY KEY AUTOINCREMENT,
            id               TEXT NOT NULL UNIQUE,
            show_id          TEXT NOT NULL UNIQUE,
            session_id       TEXT NOT NULL,
            recorded_at      TEXT NOT NULL,
            target_app       TEXT NOT NULL,
            kind             TEXT NOT NULL,
            category         INTEGER NOT NULL,
            instance_id      TEXT NOT NULL,
            friction_tier    INTEGER NOT NULL,
            context          TEXT NOT NULL,
            decision         TEXT NOT NULL,
            latency_ms       INTEGER NOT NULL,
            final_session_ms INTEGER,
            ended_normally   INTEGER
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_shows_session ON shows(session_id);
        CREATE INDEX IF NOT EXISTS idx_outcomes_session ON outcomes(session_id);
        CREATE INDEX IF NOT EXISTS idx_outcomes_recorded_at ON outcomes(recorded_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// v2: remember which catalog version each show was drawn from.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_column: bool = tx.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('shows') WHERE name = 'catalog_version'",
        [],
        |row| row.get::<_, i32>(0),
    )? > 0;

    if !has_column {
        tx.execute_batch(
            "ALTER TABLE shows ADD COLUMN catalog_version INTEGER NOT NULL DEFAULT 0;",
        )?;
    }

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
        conn.prepare("SELECT seq, catalog_version FROM shows").unwrap();
        conn.prepare("SELECT final_session_ms, ended_normally FROM outcomes")
            .unwrap();
        conn.prepare("SELECT key, value FROM kv").unwrap();
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_incremental_migration_backfills_catalog_version() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO shows (id, session_id, target_app, kind, category, instance_id,
                                friction_tier, context, shown_at)
             VALUES ('s1', 'sess', 'social', 'launch', 0, 'reflection.why-now', 0, '{}',
                     '2026-03-04T12:00:00.000Z')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 2);
        let version: u32 = conn
            .query_row("SELECT catalog_version FROM shows WHERE id = 's1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 0);
    }
}
