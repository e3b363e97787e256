//! Attachment cache: content files on disk plus a durable SQLite index.
//!
//! Every downloaded attachment is stored exactly once, keyed by
//! `(message id, attachment index)`. The invariant maintained across
//! crashes is one-directional: an orphan file without an index row is
//! tolerated, a row without a backing file is not. `put` writes and
//! fsyncs the file before recording the row, and every removal deletes
//! the row before the file.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};

use crate::db::{cache_repo, Database};

pub mod disk;
pub mod error;

pub use disk::{DiskGauge, DiskSpace, StatvfsGauge};
pub use error::CacheError;

/// Eviction threshold: evict while free space is below `total / 10`.
const MIN_FREE_DIVISOR: u64 = 10;

/// Attempts at suffixed filenames before giving up on a write.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Identifies one attachment of one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub message_id: String,
    pub attachment_index: u32,
}

impl CacheKey {
    pub fn new(message_id: impl Into<String>, attachment_index: u32) -> Self {
        Self {
            message_id: message_id.into(),
            attachment_index,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.message_id, self.attachment_index)
    }
}

/// Content store with quota-driven eviction.
pub struct AttachmentCache {
    db: Database,
    root: PathBuf,
    gauge: Box<dyn DiskGauge>,
}

impl AttachmentCache {
    /// Creates the cache over an opened index database, ensuring the
    /// content directory exists.
    pub fn new<P: AsRef<Path>>(
        db: Database,
        root: P,
        gauge: Box<dyn DiskGauge>,
    ) -> Result<Self, CacheError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| CacheError::CreateDirectory {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { db, root, gauge })
    }

    /// The directory holding content files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Looks up the content path for a key. No side effects on a hit or a
    /// plain miss; a row whose backing file disappeared is dropped (with a
    /// warning) and reported as a miss so the content gets re-downloaded.
    pub fn get(&self, key: &CacheKey) -> Result<Option<PathBuf>, CacheError> {
        match cache_repo::find_path(&self.db, &key.message_id, key.attachment_index)? {
            Some(p) => {
                let path = PathBuf::from(p);
                if path.exists() {
                    Ok(Some(path))
                } else {
                    log::warn!(
                        "Cache entry {} lost its file at {}, dropping the stale row",
                        key,
                        path.display()
                    );
                    cache_repo::delete(&self.db, &key.message_id, key.attachment_index)?;
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Stores content under a fresh unique filename and records the index
    /// row, then runs the eviction check.
    ///
    /// The file is fully written and fsynced before the row is inserted.
    /// On a write failure the partial file is removed and no row exists;
    /// the error is fatal for this attachment only.
    pub fn put(
        &self,
        key: &CacheKey,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<PathBuf, CacheError> {
        let filename = unique_filename(original_filename);
        let path = write_exclusive(&self.root, &filename, bytes)?;

        let row = cache_repo::CacheEntryRow {
            message_id: key.message_id.clone(),
            attachment_index: key.attachment_index,
            content_path: path.to_string_lossy().into_owned(),
            created_at_us: Utc::now().timestamp_micros(),
        };
        if let Err(e) = cache_repo::insert(&self.db, &row) {
            // Roll the file back so no half-recorded entry lingers.
            remove_content_file(&path);
            return Err(e.into());
        }

        log::debug!("Cached {} at {}", key, path.display());

        if let Err(e) = self.evict_if_over_quota() {
            // The entry itself is recorded; a failed eviction pass leaves
            // the store over quota until the next put.
            log::warn!("Eviction check failed: {}", e);
        }

        Ok(path)
    }

    /// Evicts oldest entries while free space is below the threshold.
    /// Returns the number of entries evicted.
    pub fn evict_if_over_quota(&self) -> Result<u64, CacheError> {
        let mut evicted = 0u64;
        loop {
            let space = self
                .gauge
                .measure(&self.root)
                .map_err(|e| CacheError::DiskCapacity {
                    path: self.root.clone(),
                    source: e,
                })?;
            if space.free >= space.total / MIN_FREE_DIVISOR {
                break;
            }
            let Some(oldest) = cache_repo::find_oldest(&self.db)? else {
                break;
            };
            cache_repo::delete(&self.db, &oldest.message_id, oldest.attachment_index)?;
            remove_content_file(Path::new(&oldest.content_path));
            log::info!(
                "Evicted cache entry {}#{} ({})",
                oldest.message_id,
                oldest.attachment_index,
                oldest.content_path
            );
            evicted += 1;
        }
        Ok(evicted)
    }

    /// Drops every entry whose message id is not in `live_ids`, along
    /// with its file. Returns the number of entries removed.
    pub fn reconcile(&self, live_ids: &HashSet<String>) -> Result<u64, CacheError> {
        let mut removed = 0u64;
        for id in cache_repo::distinct_message_ids(&self.db)? {
            if !live_ids.contains(&id) {
                removed += self.remove_for_message(&id)?;
            }
        }
        if removed > 0 {
            log::info!("Reconciliation removed {} stale cache entries", removed);
        }
        Ok(removed)
    }

    /// Deletes every entry for a message. Returns the number removed.
    pub fn remove_for_message(&self, message_id: &str) -> Result<u64, CacheError> {
        let entries = cache_repo::find_for_message(&self.db, message_id)?;
        if entries.is_empty() {
            return Ok(0);
        }
        cache_repo::delete_for_message(&self.db, message_id)?;
        for entry in &entries {
            remove_content_file(Path::new(&entry.content_path));
        }
        log::debug!(
            "Removed {} cache entries for message {}",
            entries.len(),
            message_id
        );
        Ok(entries.len() as u64)
    }

    /// Number of entries currently recorded in the index.
    pub fn entry_count(&self) -> Result<u64, CacheError> {
        Ok(cache_repo::count(&self.db)?)
    }
}

/// Returns the canonical content directory: `~/.mailframe/cache`.
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".mailframe").join("cache"))
}

/// Derives a cache filename from the attachment's original name: the
/// lowercased, sanitized stem plus a microsecond timestamp, keeping the
/// extension. Repeated sends of `img.jpg` thus never collide.
fn unique_filename(original: &str) -> String {
    let lowered = original.to_lowercase();
    let (stem, ext) = split_filename(&lowered);
    let stem = sanitize_stem(stem);
    let stamp = Local::now().format("%Y%m%d%H%M%S%6f");
    format!("{}_{}{}", stem, stamp, ext)
}

/// Splits a filename into stem and extension (extension keeps its dot).
fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// Restricts a filename stem to `[A-Za-z0-9._-]`, mapping everything else
/// to underscores. An empty result becomes "attachment".
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

/// Creates `dir/filename` with O_EXCL semantics, falling back to `_2`,
/// `_3`, ... suffixes on collision. The content is written and fsynced
/// before the path is returned; on failure the partial file is removed.
fn write_exclusive(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf, CacheError> {
    let (base, ext) = split_filename(filename);

    for counter in 1..=MAX_NAME_ATTEMPTS {
        let try_filename = if counter == 1 {
            filename.to_string()
        } else {
            format!("{}_{}{}", base, counter, ext)
        };
        let try_path = dir.join(&try_filename);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&try_path)
        {
            Ok(mut file) => {
                let written = file
                    .write_all(content)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| CacheError::WriteFile {
                        path: try_path.clone(),
                        source: e,
                    });
                if let Err(e) = written {
                    drop(file);
                    remove_content_file(&try_path);
                    return Err(e);
                }
                return Ok(try_path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                continue;
            }
            Err(e) => {
                return Err(CacheError::WriteFile {
                    path: try_path,
                    source: e,
                });
            }
        }
    }

    Err(CacheError::FilenameExhausted {
        filename: filename.to_string(),
    })
}

/// Best-effort file removal. A missing file is fine (the row is already
/// gone, so at worst an orphan remains); anything else is logged.
fn remove_content_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove cache file {}: {}", path.display(), e);
        }
    }
}
