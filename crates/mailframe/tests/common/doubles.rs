//! Scripted collaborator doubles for driving the slideshow controller.
//!
//! Each double implements one of the controller's trait seams. State the
//! tests need to inspect afterwards lives behind cloneable log handles,
//! since the controller takes ownership of the boxed doubles.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mailframe::cache::{DiskGauge, DiskSpace};
use mailframe::mailbox::{Disposition, FetchedMessage, Mailbox, MailboxError, ScreenOutcome};
use mailframe::present::{DispositionPrompt, InteractionSource, PresentError, Presenter};
use mailframe::schedule::PowerControl;
use mailframe::transform::{MediaTransform, SlideMeta, TransformError};

// ---------------------------------------------------------------------------
// Mailbox

/// Shared view into a `ScriptedMailbox`, kept by the test after the
/// controller takes ownership of the box.
#[derive(Clone, Default)]
pub struct MailboxLog {
    inner: Arc<Mutex<MailboxLogInner>>,
}

#[derive(Default)]
struct MailboxLogInner {
    screened: Vec<u32>,
    fetched: Vec<u32>,
    dispositions: Vec<(u32, Disposition)>,
    reconnects: u32,
    logouts: u32,
}

impl MailboxLog {
    pub fn screened(&self) -> Vec<u32> {
        self.inner.lock().unwrap().screened.clone()
    }

    pub fn fetched(&self) -> Vec<u32> {
        self.inner.lock().unwrap().fetched.clone()
    }

    pub fn dispositions(&self) -> Vec<(u32, Disposition)> {
        self.inner.lock().unwrap().dispositions.clone()
    }

    pub fn reconnects(&self) -> u32 {
        self.inner.lock().unwrap().reconnects
    }

    pub fn logouts(&self) -> u32 {
        self.inner.lock().unwrap().logouts
    }
}

/// In-memory mailbox with scripted contents and failure modes.
pub struct ScriptedMailbox {
    messages: Vec<FetchedMessage>,
    rejected: Vec<u32>,
    vanish_on_fetch: Vec<u32>,
    fail_moves: bool,
    fail_next_list: bool,
    raise_on_reconnect: Option<Arc<AtomicBool>>,
    log: MailboxLog,
}

impl ScriptedMailbox {
    pub fn new(messages: Vec<FetchedMessage>) -> Self {
        Self {
            messages,
            rejected: vec![],
            vanish_on_fetch: vec![],
            fail_moves: false,
            fail_next_list: false,
            raise_on_reconnect: None,
            log: MailboxLog::default(),
        }
    }

    /// Clone the log handle for post-run assertions.
    pub fn log(&self) -> MailboxLog {
        self.log.clone()
    }

    /// Make the subject gate turn this uid away.
    pub fn reject(mut self, uid: u32) -> Self {
        self.rejected.push(uid);
        self
    }

    /// Make this uid disappear between listing and fetch.
    pub fn vanish_on_fetch(mut self, uid: u32) -> Self {
        self.vanish_on_fetch.push(uid);
        self
    }

    /// Make every archive/delete move fail with the message still present.
    pub fn fail_moves(mut self) -> Self {
        self.fail_moves = true;
        self
    }

    /// Fail the next listing with a protocol error, once.
    pub fn fail_next_list(mut self) -> Self {
        self.fail_next_list = true;
        self
    }

    /// Raise the given flag when `reconnect` runs, so `run` terminates
    /// right after recovering.
    pub fn raise_on_reconnect(mut self, flag: Arc<AtomicBool>) -> Self {
        self.raise_on_reconnect = Some(flag);
        self
    }

    fn remove(&mut self, uid: u32) {
        self.messages.retain(|m| m.uid != uid);
    }
}

impl Mailbox for ScriptedMailbox {
    fn list_all(&mut self) -> Result<Vec<u32>, MailboxError> {
        if self.fail_next_list {
            self.fail_next_list = false;
            return Err(MailboxError::ProtocolError(
                "scripted listing failure".to_string(),
            ));
        }
        Ok(self.messages.iter().map(|m| m.uid).collect())
    }

    fn screen_subject(&mut self, uid: u32) -> Result<ScreenOutcome, MailboxError> {
        self.log.inner.lock().unwrap().screened.push(uid);
        if self.rejected.contains(&uid) {
            self.remove(uid);
            return Ok(ScreenOutcome::Rejected);
        }
        Ok(ScreenOutcome::Admitted)
    }

    fn fetch(&mut self, uid: u32) -> Result<Option<FetchedMessage>, MailboxError> {
        self.log.inner.lock().unwrap().fetched.push(uid);
        if self.vanish_on_fetch.contains(&uid) {
            self.remove(uid);
            return Ok(None);
        }
        Ok(self.messages.iter().find(|m| m.uid == uid).cloned())
    }

    fn apply_disposition(&mut self, uid: u32, disposition: Disposition) -> Result<(), MailboxError> {
        self.log
            .inner
            .lock()
            .unwrap()
            .dispositions
            .push((uid, disposition));
        if disposition == Disposition::Keep {
            return Ok(());
        }
        if self.fail_moves {
            return Err(MailboxError::MoveFailed {
                uid,
                folder: "Stored".to_string(),
                reason: "scripted move failure".to_string(),
            });
        }
        self.remove(uid);
        Ok(())
    }

    fn reconnect(&mut self, _shutdown: &AtomicBool) -> Result<(), MailboxError> {
        self.log.inner.lock().unwrap().reconnects += 1;
        if let Some(flag) = &self.raise_on_reconnect {
            flag.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    fn logout(&mut self) -> Result<(), MailboxError> {
        self.log.inner.lock().unwrap().logouts += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Presenter

/// Shared record of everything the presenter was asked to show.
#[derive(Clone, Default)]
pub struct PresentLog {
    inner: Arc<Mutex<PresentLogInner>>,
}

#[derive(Default)]
struct PresentLogInner {
    images: Vec<PathBuf>,
    /// Played videos with whether the interrupt fired during playback.
    videos: Vec<(PathBuf, bool)>,
}

impl PresentLog {
    pub fn images(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().images.clone()
    }

    pub fn videos(&self) -> Vec<(PathBuf, bool)> {
        self.inner.lock().unwrap().videos.clone()
    }
}

/// Presenter that records instead of spawning viewers.
#[derive(Default)]
pub struct RecordingPresenter {
    log: PresentLog,
    fail_images: bool,
}

impl RecordingPresenter {
    /// Presenter whose `show_image` always fails.
    pub fn failing() -> Self {
        Self {
            log: PresentLog::default(),
            fail_images: true,
        }
    }

    pub fn log(&self) -> PresentLog {
        self.log.clone()
    }
}

impl Presenter for RecordingPresenter {
    fn show_image(&mut self, path: &Path) -> Result<(), PresentError> {
        if self.fail_images {
            return Err(PresentError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted viewer failure",
            )));
        }
        self.log.inner.lock().unwrap().images.push(path.to_path_buf());
        Ok(())
    }

    fn play_video(
        &mut self,
        path: &Path,
        interrupt: &mut dyn FnMut() -> bool,
    ) -> Result<(), PresentError> {
        // Poll the interrupt a few times like the real player supervisor.
        let mut interrupted = false;
        for _ in 0..3 {
            if interrupt() {
                interrupted = true;
                break;
            }
        }
        self.log
            .inner
            .lock()
            .unwrap()
            .videos
            .push((path.to_path_buf(), interrupted));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transform

/// Shared record of every source handed to the transform.
#[derive(Clone, Default)]
pub struct TransformLog {
    inner: Arc<Mutex<Vec<PathBuf>>>,
}

impl TransformLog {
    pub fn prepared(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().clone()
    }
}

/// Transform that hands the cached original straight back.
#[derive(Default)]
pub struct PassthroughTransform {
    log: TransformLog,
    fail: bool,
}

impl PassthroughTransform {
    /// Transform whose `prepare` always fails, forcing the fallback to
    /// the unstyled original.
    pub fn failing() -> Self {
        Self {
            log: TransformLog::default(),
            fail: true,
        }
    }

    pub fn log(&self) -> TransformLog {
        self.log.clone()
    }
}

impl MediaTransform for PassthroughTransform {
    fn prepare(&self, source: &Path, _meta: &SlideMeta) -> Result<PathBuf, TransformError> {
        self.log.inner.lock().unwrap().push(source.to_path_buf());
        if self.fail {
            return Err(TransformError::MissingFilename(source.to_path_buf()));
        }
        Ok(source.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Interaction and disposition

/// Interaction source popping one scripted answer per poll.
pub struct ScriptedInteraction {
    presses: VecDeque<bool>,
}

impl ScriptedInteraction {
    pub fn new(presses: impl IntoIterator<Item = bool>) -> Self {
        Self {
            presses: presses.into_iter().collect(),
        }
    }

    /// Interaction source that never fires.
    pub fn idle() -> Self {
        Self::new([])
    }
}

impl InteractionSource for ScriptedInteraction {
    fn interacted(&mut self) -> bool {
        self.presses.pop_front().unwrap_or(false)
    }
}

/// Prompt answering from a scripted queue, `Keep` once exhausted.
pub struct ScriptedPrompt {
    choices: VecDeque<Disposition>,
}

impl ScriptedPrompt {
    pub fn new(choices: impl IntoIterator<Item = Disposition>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }

    pub fn keep_all() -> Self {
        Self::new([])
    }
}

impl DispositionPrompt for ScriptedPrompt {
    fn choose(&mut self) -> Disposition {
        self.choices.pop_front().unwrap_or(Disposition::Keep)
    }
}

// ---------------------------------------------------------------------------
// Disk and display

/// Gauge reporting a wide-open disk so eviction never triggers.
pub struct PlentyGauge;

impl DiskGauge for PlentyGauge {
    fn measure(&self, _path: &Path) -> io::Result<DiskSpace> {
        Ok(DiskSpace {
            total: 1_000_000,
            free: 1_000_000,
        })
    }
}

/// Power control that accepts every request silently.
pub struct NoopPower;

impl PowerControl for NoopPower {
    fn set_display_power(&self, _on: bool) -> io::Result<()> {
        Ok(())
    }
}
