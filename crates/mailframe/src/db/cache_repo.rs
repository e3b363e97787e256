//! Cache entry repository — CRUD operations for the `cache` table.
//!
//! A row maps one (message id, attachment index) key to the file holding
//! the downloaded content, stamped with its creation time in epoch
//! microseconds. Eviction order relies on that stamp, so it must be
//! finer than one second: a burst download can create several entries
//! within the same second.

use rusqlite::params;

use super::{Database, DatabaseError};

/// A raw cache entry row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryRow {
    pub message_id: String,
    pub attachment_index: u32,
    pub content_path: String,
    pub created_at_us: i64,
}

/// Inserts a cache entry. An existing row for the same key is replaced.
pub fn insert(db: &Database, row: &CacheEntryRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR REPLACE INTO cache (message_id, attachment_index, content_path, created_at_us)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.message_id,
                row.attachment_index,
                row.content_path,
                row.created_at_us,
            ],
        )?;
        Ok(())
    })
}

/// Looks up the content path for a key.
pub fn find_path(
    db: &Database,
    message_id: &str,
    attachment_index: u32,
) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT content_path FROM cache
             WHERE message_id = ?1 AND attachment_index = ?2",
        )?;
        let mut rows = stmt.query_map(params![message_id, attachment_index], |row| {
            row.get::<_, String>(0)
        })?;
        match rows.next() {
            Some(Ok(val)) => Ok(Some(val)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns the oldest entry by creation time, ties broken by insertion
/// order. This is the eviction candidate.
pub fn find_oldest(db: &Database) -> Result<Option<CacheEntryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT message_id, attachment_index, content_path, created_at_us FROM cache
             ORDER BY created_at_us ASC, rowid ASC LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], row_to_entry)?;
        match rows.next() {
            Some(Ok(val)) => Ok(Some(val)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns all entries for a message, in attachment order.
pub fn find_for_message(
    db: &Database,
    message_id: &str,
) -> Result<Vec<CacheEntryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT message_id, attachment_index, content_path, created_at_us FROM cache
             WHERE message_id = ?1 ORDER BY attachment_index ASC",
        )?;
        let result: Vec<CacheEntryRow> = stmt
            .query_map(params![message_id], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    })
}

/// Returns the distinct message ids present in the index.
pub fn distinct_message_ids(db: &Database) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT DISTINCT message_id FROM cache")?;
        let result: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    })
}

/// Deletes a single entry by key. Returns the number of rows deleted.
pub fn delete(
    db: &Database,
    message_id: &str,
    attachment_index: u32,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.execute(
            "DELETE FROM cache WHERE message_id = ?1 AND attachment_index = ?2",
            params![message_id, attachment_index],
        )?;
        Ok(count as u64)
    })
}

/// Deletes all entries for a message. Returns the number of rows deleted.
pub fn delete_for_message(db: &Database, message_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.execute(
            "DELETE FROM cache WHERE message_id = ?1",
            params![message_id],
        )?;
        Ok(count as u64)
    })
}

/// Counts all entries in the index.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |r| r.get(0))?;
        Ok(count)
    })
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<CacheEntryRow, rusqlite::Error> {
    Ok(CacheEntryRow {
        message_id: row.get(0)?,
        attachment_index: row.get(1)?,
        content_path: row.get(2)?,
        created_at_us: row.get(3)?,
    })
}
