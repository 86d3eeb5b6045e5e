//! Durable catalog of remote message ids and their metadata
//!
//! Every mutating call runs in its own statement or transaction and is
//! committed before it returns, so an interrupted sync resumes from the
//! catalog alone.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::pool::{self, DbConnection, DbPool};
use super::schema;
use crate::error::FetchError;
use crate::types::labels;
use crate::types::{ItemRecord, RecordUpdate};

/// Stays well below SQLITE_MAX_VARIABLE_NUMBER on every SQLite build.
const MAX_BOUND_PARAMS: usize = 500;

/// Which rows `Catalog::count` considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountFilter {
    All,
    Unhydrated,
}

pub struct Catalog {
    pool: DbPool,
    path: Option<PathBuf>,
}

impl Catalog {
    /// Open (or create) the catalog file and make sure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let pool = pool::create_pool(path)?;

        let catalog = Self {
            pool,
            path: Some(path.to_path_buf()),
        };
        catalog.init_schema()?;
        debug!("Opened catalog at {}", path.display());
        Ok(catalog)
    }

    /// Create an in-memory catalog (for testing)
    pub fn in_memory() -> Result<Self, FetchError> {
        let pool = pool::create_memory_pool()?;

        let catalog = Self { pool, path: None };
        catalog.init_schema()?;
        Ok(catalog)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a connection from the pool
    pub(crate) fn connection(&self) -> Result<DbConnection, FetchError> {
        Ok(self.pool.get()?)
    }

    /// Idempotent; never touches existing rows.
    pub fn init_schema(&self) -> Result<(), FetchError> {
        let conn = self.connection()?;
        schema::initialize_schema(&conn)
    }

    /// Insert-or-ignore every id. Returns how many rows were created.
    pub fn insert_identities<I, S>(&self, ids: I) -> Result<usize, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let conn = self.connection()?;
        let tx = conn.unchecked_transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO messages (id) VALUES (?1)")?;
            for id in ids {
                inserted += stmt.execute(params![id.as_ref()])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// True iff at least one of `ids` is not in the catalog yet.
    pub fn has_unseen_among<I, S>(&self, ids: I) -> Result<bool, FetchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        if unique.is_empty() {
            return Ok(false);
        }

        let conn = self.connection()?;
        let unique: Vec<String> = unique.into_iter().collect();

        for chunk in unique.chunks(MAX_BOUND_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!("SELECT COUNT(*) FROM messages WHERE id IN ({placeholders})");
            let known: i64 = conn.query_row(&sql, params_from_iter(chunk.iter()), |row| row.get(0))?;
            if (known as usize) < chunk.len() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub fn count(&self, filter: CountFilter) -> Result<u64, FetchError> {
        let sql = match filter {
            CountFilter::All => "SELECT COUNT(*) FROM messages",
            CountFilter::Unhydrated => "SELECT COUNT(*) FROM messages WHERE timestamp = 0",
        };

        let conn = self.connection()?;
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Snapshot of the hydration backlog, taken with a fresh query.
    ///
    /// Later writes are not observed by the returned iterator; call again to
    /// see the current backlog.
    pub fn unhydrated_ids(&self) -> Result<Backlog, FetchError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT id FROM messages WHERE timestamp = 0 ORDER BY rowid")?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Backlog {
            ids: ids.into_iter(),
        })
    }

    /// Overwrite all metadata of an existing record.
    ///
    /// Unknown ids are ignored, hydration never creates rows. Returns whether
    /// a row was updated.
    pub fn update_record(&self, update: &RecordUpdate) -> Result<bool, FetchError> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE messages
             SET [from] = ?1, delivered_to = ?2, subject = ?3, timestamp = ?4, labels = ?5
             WHERE id = ?6",
            params![
                update.from,
                update.delivered_to,
                update.subject,
                update.timestamp,
                labels::encode(&update.labels),
                update.id,
            ],
        )?;

        if changed == 0 {
            debug!("Ignoring update for unknown id {}", update.id);
        }
        Ok(changed > 0)
    }

    pub fn get(&self, id: &str) -> Result<Option<ItemRecord>, FetchError> {
        let conn = self.connection()?;
        let record = conn
            .query_row(
                "SELECT id, [from], delivered_to, subject, timestamp, labels
                 FROM messages WHERE id = ?1",
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Every record in insertion order
    pub fn records(&self) -> Result<Vec<ItemRecord>, FetchError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, [from], delivered_to, subject, timestamp, labels
             FROM messages ORDER BY rowid",
        )?;

        let records = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn record_from_row(row: &Row) -> rusqlite::Result<ItemRecord> {
    let labels_field: Option<String> = row.get(5)?;
    let labels = match labels_field.as_deref() {
        None | Some("") => Vec::new(),
        Some(field) => labels::decode(field),
    };

    Ok(ItemRecord {
        id: row.get(0)?,
        from: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        delivered_to: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        subject: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        timestamp: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        labels,
    })
}

/// Finite, restartable view of the ids still waiting for hydration
#[derive(Debug)]
pub struct Backlog {
    ids: std::vec::IntoIter<String>,
}

impl Iterator for Backlog {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Backlog {}
