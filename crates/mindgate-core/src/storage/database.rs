//! SQLite-backed outcome log.
//!
//! Provides persistent storage for:
//! - Shown interventions (the show log)
//! - Decisions and their session-end patches
//! - Key-value store for engine state such as the install date

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations};
use crate::content::ContentCategory;
use crate::effectiveness::{
    InterventionKind, InterventionOutcome, OutcomeStore, PatchStatus, ShowRecord, UserDecision,
};
use crate::error::StoreError;
use crate::friction::FrictionTier;

const INSTALL_DATE_KEY: &str = "install_date";

const SHOW_COLUMNS: &str = "id, session_id, target_app, kind, category, instance_id,
                            friction_tier, context, shown_at, catalog_version";

const OUTCOME_COLUMNS: &str = "id, show_id, session_id, recorded_at, target_app, kind, category,
                               instance_id, friction_tier, context, decision, latency_ms,
                               final_session_ms, ended_normally";

/// SQLite database for the show and outcome logs.
///
/// The connection sits behind a mutex so one `Database` can be shared across
/// threads as an [`OutcomeStore`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/mindgate/mindgate.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("mindgate.db"))
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// The stored install date, writing `now` on first use.
    pub fn ensure_install_date(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
        if let Some(raw) = self.kv_get(INSTALL_DATE_KEY)? {
            return parse_ts(INSTALL_DATE_KEY, &raw);
        }
        self.kv_set(INSTALL_DATE_KEY, &format_ts(now))?;
        Ok(now)
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    // Fixed-width UTC so lexical order in SQL matches time order.
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(id, e))
}

fn corrupt(id: &str, message: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        message: message.to_string(),
    }
}

fn category_from_column(id: &str, raw: u8) -> Result<ContentCategory, StoreError> {
    ContentCategory::from_u8(raw).ok_or_else(|| corrupt(id, format!("unknown category {raw}")))
}

struct ShowRow {
    id: String,
    session_id: String,
    target_app: String,
    kind: String,
    category: u8,
    instance_id: String,
    friction_tier: u8,
    context: String,
    shown_at: String,
    catalog_version: u32,
}

impl ShowRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            target_app: row.get(2)?,
            kind: row.get(3)?,
            category: row.get(4)?,
            instance_id: row.get(5)?,
            friction_tier: row.get(6)?,
            context: row.get(7)?,
            shown_at: row.get(8)?,
            catalog_version: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<ShowRecord, StoreError> {
        Ok(ShowRecord {
            kind: self.kind.parse().map_err(|e| corrupt(&self.id, e))?,
            category: category_from_column(&self.id, self.category)?,
            friction_tier: FrictionTier::from_u8(self.friction_tier),
            context: serde_json::from_str(&self.context).map_err(|e| corrupt(&self.id, e))?,
            shown_at: parse_ts(&self.id, &self.shown_at)?,
            catalog_version: self.catalog_version,
            session_id: self.session_id,
            target_app: self.target_app,
            instance_id: self.instance_id,
            id: self.id,
        })
    }
}

struct OutcomeRow {
    id: String,
    show_id: String,
    session_id: String,
    recorded_at: String,
    target_app: String,
    kind: String,
    category: u8,
    instance_id: String,
    friction_tier: u8,
    context: String,
    decision: String,
    latency_ms: u64,
    final_session_ms: Option<u64>,
    ended_normally: Option<bool>,
}

impl OutcomeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            show_id: row.get(1)?,
            session_id: row.get(2)?,
            recorded_at: row.get(3)?,
            target_app: row.get(4)?,
            kind: row.get(5)?,
            category: row.get(6)?,
            instance_id: row.get(7)?,
            friction_tier: row.get(8)?,
            context: row.get(9)?,
            decision: row.get(10)?,
            latency_ms: row.get(11)?,
            final_session_ms: row.get(12)?,
            ended_normally: row.get(13)?,
        })
    }

    fn into_outcome(self) -> Result<InterventionOutcome, StoreError> {
        let kind: InterventionKind = self.kind.parse().map_err(|e| corrupt(&self.id, e))?;
        let decision: UserDecision = self.decision.parse().map_err(|e| corrupt(&self.id, e))?;
        Ok(InterventionOutcome {
            recorded_at: parse_ts(&self.id, &self.recorded_at)?,
            kind,
            category: category_from_column(&self.id, self.category)?,
            friction_tier: FrictionTier::from_u8(self.friction_tier),
            context: serde_json::from_str(&self.context).map_err(|e| corrupt(&self.id, e))?,
            decision,
            latency_ms: self.latency_ms,
            final_session_ms: self.final_session_ms,
            ended_normally: self.ended_normally,
            show_id: self.show_id,
            session_id: self.session_id,
            target_app: self.target_app,
            instance_id: self.instance_id,
            id: self.id,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl OutcomeStore for Database {
    fn record_show(&self, show: &ShowRecord) -> Result<(), StoreError> {
        let context = serde_json::to_string(&show.context).map_err(|e| corrupt(&show.id, e))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO shows (id, session_id, target_app, kind, category, instance_id,
                                friction_tier, context, shown_at, catalog_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                show.id,
                show.session_id,
                show.target_app,
                show.kind.as_str(),
                show.category.as_u8(),
                show.instance_id,
                show.friction_tier.as_u8(),
                context,
                format_ts(show.shown_at),
                show.catalog_version,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(show.id.clone())
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn latest_show(&self, session_id: &str) -> Result<Option<ShowRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SHOW_COLUMNS} FROM shows WHERE session_id = ?1
                     ORDER BY seq DESC LIMIT 1"
                ),
                [session_id],
                ShowRow::from_row,
            )
            .optional()?;
        row.map(ShowRow::into_record).transpose()
    }

    fn recent_shows(&self, limit: usize) -> Result<Vec<ShowRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows ORDER BY seq DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map([limit as i64], ShowRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ShowRow::into_record).collect()
    }

    fn append_outcome(&self, outcome: &InterventionOutcome) -> Result<(), StoreError> {
        let context =
            serde_json::to_string(&outcome.context).map_err(|e| corrupt(&outcome.id, e))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO outcomes (id, show_id, session_id, recorded_at, target_app, kind,
                                   category, instance_id, friction_tier, context, decision,
                                   latency_ms, final_session_ms, ended_normally)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                outcome.id,
                outcome.show_id,
                outcome.session_id,
                format_ts(outcome.recorded_at),
                outcome.target_app,
                outcome.kind.as_str(),
                outcome.category.as_u8(),
                outcome.instance_id,
                outcome.friction_tier.as_u8(),
                context,
                outcome.decision.as_str(),
                outcome.latency_ms,
                outcome.final_session_ms,
                outcome.ended_normally,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(outcome.show_id.clone())
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn patch_session(
        &self,
        session_id: &str,
        final_session_ms: u64,
        ended_normally: bool,
    ) -> Result<PatchStatus, StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let total: i64 = tx.query_row(
            "SELECT COUNT(*) FROM outcomes WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        if total == 0 {
            return Ok(PatchStatus::NotFound);
        }

        let target: Option<i64> = tx
            .query_row(
                "SELECT seq FROM outcomes
                 WHERE session_id = ?1 AND final_session_ms IS NULL
                 ORDER BY seq DESC LIMIT 1",
                [session_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(seq) = target else {
            return Ok(PatchStatus::AlreadyPatched);
        };

        tx.execute(
            "UPDATE outcomes SET final_session_ms = ?1, ended_normally = ?2 WHERE seq = ?3",
            params![final_session_ms, ended_normally, seq],
        )?;
        tx.commit()?;
        Ok(PatchStatus::Applied)
    }

    fn outcomes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InterventionOutcome>, StoreError> {
        let conn = self.lock()?;
        let rows = match since {
            Some(t) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {OUTCOME_COLUMNS} FROM outcomes WHERE recorded_at >= ?1 ORDER BY seq"
                ))?;
                let rows = stmt
                    .query_map([format_ts(t)], OutcomeRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {OUTCOME_COLUMNS} FROM outcomes ORDER BY seq"
                ))?;
                let rows = stmt
                    .query_map([], OutcomeRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(OutcomeRow::into_outcome).collect()
    }

    fn outcome_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM outcomes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn recent_latencies(&self, limit: usize) -> Result<Vec<u64>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT latency_ms FROM outcomes ORDER BY seq DESC LIMIT ?1")?;
        let latencies = stmt
            .query_map([limit as i64], |row| row.get::<_, u64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(latencies)
    }
}
