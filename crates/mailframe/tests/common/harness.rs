//! Test harness for isolated slideshow execution.
//!
//! `FrameHarness` provides a complete isolated environment: an in-memory
//! cache index, a temp directory for cached content, and wiring helpers
//! that assemble a `SlideshowController` from scripted doubles.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tempfile::TempDir;

use mailframe::cache::{AttachmentCache, CacheKey};
use mailframe::db::Database;
use mailframe::schedule::DisplayScheduler;
use mailframe::slideshow::SlideshowController;

use super::doubles::{
    MailboxLog, NoopPower, PassthroughTransform, PlentyGauge, PresentLog, RecordingPresenter,
    ScriptedInteraction, ScriptedMailbox, ScriptedPrompt, TransformLog,
};

/// A wired controller plus the log handles its doubles write to.
pub struct Frame {
    pub controller: SlideshowController,
    pub mailbox_log: MailboxLog,
    pub presented: PresentLog,
    pub transformed: TransformLog,
}

/// Isolated environment shared by every controller a test wires up.
pub struct FrameHarness {
    temp_dir: TempDir,
    /// Directory holding cached attachment content.
    pub cache_root: PathBuf,
    db: Database,
    /// Termination flag handed to every controller.
    pub shutdown: Arc<AtomicBool>,
}

impl FrameHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache_root = temp_dir.path().join("cache");
        let db = Database::open_in_memory().expect("Failed to open index database");
        Self {
            temp_dir,
            cache_root,
            db,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A cache over the harness's index and content directory. Every call
    /// returns a fresh handle onto the same storage.
    pub fn cache(&self) -> AttachmentCache {
        AttachmentCache::new(self.db.clone(), &self.cache_root, Box::new(PlentyGauge))
            .expect("Failed to create cache")
    }

    /// Pre-seed a cache entry, as if a previous run had stored it.
    pub fn seed_entry(&self, message_id: &str, index: u32, filename: &str) -> PathBuf {
        self.cache()
            .put(&CacheKey::new(message_id, index), b"seeded", filename)
            .expect("Failed to seed cache entry")
    }

    /// Controller with inert interaction, keep-only prompt, zero dwell.
    pub fn frame(&self, mailbox: ScriptedMailbox) -> Frame {
        self.frame_with(
            mailbox,
            ScriptedInteraction::idle(),
            ScriptedPrompt::keep_all(),
            0,
        )
    }

    /// Controller with scripted interaction and prompt.
    pub fn frame_with(
        &self,
        mailbox: ScriptedMailbox,
        interaction: ScriptedInteraction,
        prompt: ScriptedPrompt,
        dwell_secs: u32,
    ) -> Frame {
        let mailbox_log = mailbox.log();
        let presenter = RecordingPresenter::default();
        let presented = presenter.log();
        let transform = PassthroughTransform::default();
        let transformed = transform.log();

        let controller = SlideshowController::new(
            Box::new(mailbox),
            self.cache(),
            DisplayScheduler::new(None, Box::new(NoopPower)),
            Box::new(transform),
            Box::new(presenter),
            Box::new(interaction),
            Box::new(prompt),
            dwell_secs,
            Arc::clone(&self.shutdown),
        );

        Frame {
            controller,
            mailbox_log,
            presented,
            transformed,
        }
    }

    /// Every index row as `(message_id, attachment_index, content_path)`.
    pub fn cache_rows(&self) -> Vec<(String, u32, String)> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT message_id, attachment_index, content_path FROM cache \
                     ORDER BY message_id, attachment_index",
                )?;
                let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .expect("Failed to query cache rows")
    }

    /// Sorted names of the files currently in the content directory.
    pub fn content_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.cache_root)
            .expect("Failed to read cache root")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

impl Default for FrameHarness {
    fn default() -> Self {
        Self::new()
    }
}
