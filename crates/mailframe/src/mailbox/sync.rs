//! Blocking mailbox facade over the async IMAP session.
//!
//! The slideshow is a single synchronous control flow; this facade owns a
//! current-thread tokio runtime and drives the async session with
//! `block_on`, exposing the capability set behind the `Mailbox` trait so
//! tests can substitute a scripted mailbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{error, info};
use secrecy::SecretString;

use super::error::{MailboxError, Result};
use super::message::{parse_message, FetchedMessage};
use super::session::ImapSession;

/// Where DELETE dispositions land.
pub const TRASH_FOLDER: &str = "[Gmail]/Trash";
/// Where ARCHIVE dispositions land.
pub const ARCHIVE_FOLDER: &str = "Stored";
/// Where messages failing the subject gate land.
pub const REJECT_FOLDER: &str = "password reject";

/// Delay between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Terminal per-message decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Archive,
    Delete,
}

/// Result of the subject gate for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOutcome {
    /// No gate configured, or the subject carries the token.
    Admitted,
    /// Token missing; the message has been moved to the reject folder.
    Rejected,
    /// The message disappeared between listing and screening.
    Vanished,
}

/// Capability set the slideshow needs from the remote mailbox.
pub trait Mailbox: Send {
    /// Every message id currently in the watched folder.
    fn list_all(&mut self) -> Result<Vec<u32>>;

    /// Applies the subject gate from the envelope alone, moving rejected
    /// messages to the reject folder. Content is never downloaded here.
    fn screen_subject(&mut self, uid: u32) -> Result<ScreenOutcome>;

    /// Fetches and parses a full message. `Ok(None)` means it vanished
    /// since the listing.
    fn fetch(&mut self, uid: u32) -> Result<Option<FetchedMessage>>;

    /// Applies a disposition. KEEP is a no-op; ARCHIVE and DELETE move
    /// the message and succeed on an already-moved message.
    fn apply_disposition(&mut self, uid: u32, disposition: Disposition) -> Result<()>;

    /// Re-establishes the connection, retrying every 10 s until it
    /// succeeds or the termination flag is raised.
    fn reconnect(&mut self, shutdown: &AtomicBool) -> Result<()>;

    /// Graceful logout.
    fn logout(&mut self) -> Result<()>;
}

/// Production mailbox backed by one long-lived IMAP session.
pub struct MailboxSync {
    runtime: tokio::runtime::Runtime,
    session: ImapSession,
    /// Lowercased subject token; `None` disables the gate.
    subject_token: Option<String>,
}

impl MailboxSync {
    pub fn new(
        server: impl Into<String>,
        login: impl Into<String>,
        password: SecretString,
        folder: impl Into<String>,
        subject_token: Option<String>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            session: ImapSession::new(server, login, password, folder),
            subject_token: subject_token.map(|t| t.to_lowercase()),
        })
    }

    /// Initial connect with the same retry behavior as `reconnect`.
    pub fn connect(&mut self, shutdown: &AtomicBool) -> Result<()> {
        self.reconnect(shutdown)
    }

    /// Sleeps in one-second slices so shutdown stays responsive.
    fn interruptible_wait(delay: Duration, shutdown: &AtomicBool) -> Result<()> {
        let deadline = std::time::Instant::now() + delay;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Err(MailboxError::Interrupted);
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            std::thread::sleep(remaining.min(Duration::from_secs(1)));
        }
    }
}

impl Mailbox for MailboxSync {
    fn list_all(&mut self) -> Result<Vec<u32>> {
        self.runtime.block_on(self.session.search_all())
    }

    fn screen_subject(&mut self, uid: u32) -> Result<ScreenOutcome> {
        let Some(token) = self.subject_token.clone() else {
            return Ok(ScreenOutcome::Admitted);
        };

        let Some(subject) = self.runtime.block_on(self.session.fetch_subject(uid))? else {
            return Ok(ScreenOutcome::Vanished);
        };

        if subject_admits(&token, subject.as_deref().unwrap_or("")) {
            return Ok(ScreenOutcome::Admitted);
        }

        info!(
            "Message {} failed the subject gate, moving to '{}'",
            uid, REJECT_FOLDER
        );
        self.runtime
            .block_on(self.session.move_to(uid, REJECT_FOLDER))?;
        Ok(ScreenOutcome::Rejected)
    }

    fn fetch(&mut self, uid: u32) -> Result<Option<FetchedMessage>> {
        match self.runtime.block_on(self.session.fetch_body(uid))? {
            Some(raw) => parse_message(&raw, uid).map(Some),
            None => Ok(None),
        }
    }

    fn apply_disposition(&mut self, uid: u32, disposition: Disposition) -> Result<()> {
        let folder = match disposition {
            Disposition::Keep => return Ok(()),
            Disposition::Archive => ARCHIVE_FOLDER,
            Disposition::Delete => TRASH_FOLDER,
        };
        self.runtime.block_on(self.session.move_to(uid, folder))?;
        info!("Message {} moved to '{}'", uid, folder);
        Ok(())
    }

    fn reconnect(&mut self, shutdown: &AtomicBool) -> Result<()> {
        self.session.reset();
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Err(MailboxError::Interrupted);
            }
            match self.runtime.block_on(self.session.connect()) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    error!("Failed to connect to the IMAP server, retrying: {}", e);
                    self.session.reset();
                    Self::interruptible_wait(RECONNECT_DELAY, shutdown)?;
                }
            }
        }
    }

    fn logout(&mut self) -> Result<()> {
        self.runtime.block_on(self.session.logout())
    }
}

/// Case-insensitive containment test used by the subject gate.
fn subject_admits(lowercase_token: &str, subject: &str) -> bool {
    subject.to_lowercase().contains(lowercase_token)
}
