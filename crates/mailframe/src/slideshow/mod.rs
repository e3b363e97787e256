//! The slideshow controller: one poll cycle lists the folder, reconciles
//! the cache, then walks each message through screen → fetch → cache →
//! transform → present → dispose.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use log::{debug, error, info, warn};
use tracing::info_span;

use crate::cache::{AttachmentCache, CacheError, CacheKey};
use crate::error::FrameError;
use crate::mailbox::{
    Attachment, AttachmentKind, Disposition, FetchedMessage, Mailbox, MailboxError, ScreenOutcome,
};
use crate::present::{DispositionPrompt, InteractionSource, Presenter};
use crate::schedule::{DisplayScheduler, DisplayState};
use crate::transform::{MediaTransform, SlideMeta};

/// Interaction/cancellation poll interval.
const TICK: Duration = Duration::from_millis(100);

/// Dwell ticks per configured second.
const TICKS_PER_SECOND: u32 = 10;

/// Pause between schedule re-checks while the display sleeps.
const SLEEP_RECHECK: Duration = Duration::from_secs(900);

/// Pause before re-polling an empty folder.
const EMPTY_FOLDER_PAUSE: Duration = Duration::from_secs(1);

/// What a single poll cycle reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to the end of the listing.
    Completed,
    /// The termination flag fired somewhere inside the cycle.
    ShutdownRequested,
}

/// Flow control between the nested processing loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepFlow {
    /// Proceed with the next attachment (or message, at that level).
    Continue,
    /// Abandon the rest of this message.
    NextMessage,
    /// Stop the slideshow.
    Shutdown,
}

/// Owns the poll loop and every collaborator it drives.
pub struct SlideshowController {
    mailbox: Box<dyn Mailbox>,
    cache: AttachmentCache,
    scheduler: DisplayScheduler,
    transform: Box<dyn MediaTransform>,
    presenter: Box<dyn Presenter>,
    interaction: Box<dyn InteractionSource>,
    prompt: Box<dyn DispositionPrompt>,
    dwell_secs: u32,
    shutdown: Arc<AtomicBool>,
}

impl SlideshowController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mailbox: Box<dyn Mailbox>,
        cache: AttachmentCache,
        scheduler: DisplayScheduler,
        transform: Box<dyn MediaTransform>,
        presenter: Box<dyn Presenter>,
        interaction: Box<dyn InteractionSource>,
        prompt: Box<dyn DispositionPrompt>,
        dwell_secs: u32,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            mailbox,
            cache,
            scheduler,
            transform,
            presenter,
            interaction,
            prompt,
            dwell_secs,
            shutdown,
        }
    }

    /// Polls until the termination flag fires. Mailbox-level failures
    /// trigger a reconnect and a fresh cycle; cache index failures are
    /// fatal.
    pub fn run(&mut self) -> Result<(), FrameError> {
        info!("Slideshow started");
        while !self.shutdown_requested() {
            match self.run_cycle() {
                Ok(CycleOutcome::ShutdownRequested) => break,
                Ok(CycleOutcome::Completed) => {}
                Err(FrameError::Mailbox(MailboxError::Interrupted)) => break,
                Err(FrameError::Mailbox(e)) => {
                    error!("Mailbox failure: {}", e);
                    match self.mailbox.reconnect(&self.shutdown) {
                        Ok(()) => {}
                        Err(MailboxError::Interrupted) => break,
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e),
            }
        }
        if let Err(e) = self.mailbox.logout() {
            warn!("Logout failed: {}", e);
        }
        info!("Slideshow stopped");
        Ok(())
    }

    /// One poll pass over the folder.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, FrameError> {
        let _span = info_span!("slideshow.cycle").entered();

        let live = self.mailbox.list_all()?;
        let live_ids: HashSet<String> = live.iter().map(|uid| uid.to_string()).collect();
        self.cache.reconcile(&live_ids)?;

        if live.is_empty() {
            debug!("Folder is empty, pausing before the next poll");
            if !self.interruptible_sleep(EMPTY_FOLDER_PAUSE) {
                return Ok(CycleOutcome::ShutdownRequested);
            }
            return Ok(CycleOutcome::Completed);
        }

        for uid in live {
            if self.shutdown_requested() {
                return Ok(CycleOutcome::ShutdownRequested);
            }
            if self.process_message(uid)? == StepFlow::Shutdown {
                return Ok(CycleOutcome::ShutdownRequested);
            }
        }
        Ok(CycleOutcome::Completed)
    }

    fn process_message(&mut self, uid: u32) -> Result<StepFlow, FrameError> {
        let _span = info_span!("slideshow.message", uid).entered();

        if self.wait_until_awake() == StepFlow::Shutdown {
            return Ok(StepFlow::Shutdown);
        }

        match self.mailbox.screen_subject(uid)? {
            ScreenOutcome::Admitted => {}
            ScreenOutcome::Rejected => return Ok(StepFlow::Continue),
            ScreenOutcome::Vanished => {
                info!("Message {} vanished before screening, skipping", uid);
                return Ok(StepFlow::Continue);
            }
        }

        let Some(message) = self.mailbox.fetch(uid)? else {
            info!("Message {} vanished before fetch, skipping", uid);
            return Ok(StepFlow::Continue);
        };

        self.present_message(&message)
    }

    /// Walks a message's attachments in order, halting at the first
    /// unsupported part.
    fn present_message(&mut self, message: &FetchedMessage) -> Result<StepFlow, FrameError> {
        let meta = SlideMeta {
            sender_address: message.sender_address.clone(),
            sender_name: message.sender_name.clone(),
            date: message.date,
        };

        for attachment in &message.attachments {
            if self.shutdown_requested() {
                return Ok(StepFlow::Shutdown);
            }
            if attachment.kind == AttachmentKind::Unsupported {
                debug!(
                    "Attachment {} of message {} is unsupported ('{}'), \
                     skipping the rest of the message",
                    attachment.index, message.uid, attachment.filename
                );
                break;
            }

            let key = CacheKey::new(message.uid.to_string(), attachment.index);
            let path = match self.cached_content(&key, attachment) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Failed to cache attachment {}: {}", key, e);
                    continue;
                }
            };

            let staged = match self.transform.prepare(&path, &meta) {
                Ok(staged) => staged,
                Err(e) => {
                    warn!(
                        "Transform failed for {}: {}, presenting the original",
                        path.display(),
                        e
                    );
                    path.clone()
                }
            };

            let flow = match attachment.kind {
                AttachmentKind::Video => self.present_video(&staged),
                _ => self.present_image(message.uid, &staged)?,
            };
            match flow {
                StepFlow::Continue => {}
                StepFlow::NextMessage => return Ok(StepFlow::Continue),
                StepFlow::Shutdown => return Ok(StepFlow::Shutdown),
            }
        }
        Ok(StepFlow::Continue)
    }

    /// Cache get-or-create for one attachment.
    fn cached_content(
        &self,
        key: &CacheKey,
        attachment: &Attachment,
    ) -> Result<PathBuf, CacheError> {
        if let Some(hit) = self.cache.get(key)? {
            return Ok(hit);
        }
        debug!(
            "Cache miss for {}, storing {} bytes",
            key,
            attachment.content.len()
        );
        self.cache.put(key, &attachment.content, &attachment.filename)
    }

    /// Shows an image for the dwell duration, watching for interaction.
    fn present_image(&mut self, uid: u32, path: &Path) -> Result<StepFlow, FrameError> {
        if let Err(e) = self.presenter.show_image(path) {
            warn!("Failed to present {}: {}", path.display(), e);
            return Ok(StepFlow::Continue);
        }
        self.dwell(uid)
    }

    /// Dwell loop: `delay × 10` ticks of 100 ms, polling interaction and
    /// the termination flag each tick. The first interaction abandons the
    /// remaining dwell and asks for a disposition.
    fn dwell(&mut self, uid: u32) -> Result<StepFlow, FrameError> {
        for _ in 0..self.dwell_secs * TICKS_PER_SECOND {
            if self.shutdown_requested() {
                return Ok(StepFlow::Shutdown);
            }
            if self.interaction.interacted() {
                return self.dispose(uid);
            }
            std::thread::sleep(TICK);
        }
        Ok(StepFlow::Continue)
    }

    /// Plays a video to its end or the first interaction; interaction
    /// ends playback without opening the disposition prompt.
    fn present_video(&mut self, path: &Path) -> StepFlow {
        let shutdown = Arc::clone(&self.shutdown);
        let interaction = self.interaction.as_mut();
        let mut interrupt =
            move || shutdown.load(Ordering::Relaxed) || interaction.interacted();

        if let Err(e) = self.presenter.play_video(path, &mut interrupt) {
            warn!("Failed to play {}: {}", path.display(), e);
        }
        StepFlow::Continue
    }

    /// Asks for a disposition and applies it. A failed move leaves the
    /// message and its cache entries in place for the next cycle.
    fn dispose(&mut self, uid: u32) -> Result<StepFlow, FrameError> {
        let choice = self.prompt.choose();
        info!("Disposition for message {}: {:?}", uid, choice);

        match choice {
            Disposition::Keep => Ok(StepFlow::NextMessage),
            Disposition::Archive | Disposition::Delete => {
                match self.mailbox.apply_disposition(uid, choice) {
                    Ok(()) => {
                        self.cache.remove_for_message(&uid.to_string())?;
                        Ok(StepFlow::NextMessage)
                    }
                    Err(e @ MailboxError::MoveFailed { .. }) => {
                        warn!("{}; message stays in place for the next cycle", e);
                        Ok(StepFlow::NextMessage)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Holds while the schedule keeps the display asleep, re-checking
    /// the window every 900 s and the termination flag every second.
    fn wait_until_awake(&mut self) -> StepFlow {
        loop {
            if self.shutdown_requested() {
                return StepFlow::Shutdown;
            }
            if self.scheduler.tick(Local::now().time()) == DisplayState::Awake {
                return StepFlow::Continue;
            }
            info!(
                "Display asleep, next schedule check in {}s",
                SLEEP_RECHECK.as_secs()
            );
            if !self.interruptible_sleep(SLEEP_RECHECK) {
                return StepFlow::Shutdown;
            }
        }
    }

    /// Returns false when the termination flag fired during the wait.
    fn interruptible_sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.shutdown_requested() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(Duration::from_secs(1)));
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
