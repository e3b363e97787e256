use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};

use mailframe::cache::{default_cache_root, AttachmentCache, StatvfsGauge};
use mailframe::config::{default_config_path, load_config, Config};
use mailframe::db::{default_database_path, Database};
use mailframe::error::{ConfigError, FrameError};
use mailframe::mailbox::{MailboxError, MailboxSync};
use mailframe::present::{stdin_pair, ViewerPresenter};
use mailframe::schedule::{DisplayScheduler, DpmsPower, PowerControl};
use mailframe::slideshow::SlideshowController;
use mailframe::transform::ImageMagickTransform;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting mailframe v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), FrameError> {
    let config_path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => default_config_path()?,
    };
    info!("Loading configuration from {}", config_path.display());
    let Config { email, screen } = load_config(&config_path)?;

    let db_path = default_database_path().ok_or(ConfigError::NoHomeDirectory)?;
    let db = Database::open(&db_path)?;

    let cache_root = default_cache_root().ok_or(ConfigError::NoHomeDirectory)?;
    let cache = AttachmentCache::new(db, &cache_root, Box::new(StatvfsGauge))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Termination signal received, shutting down");
        flag.store(true, Ordering::Relaxed);
    })
    .expect("error while installing the termination handler");

    let mut mailbox = MailboxSync::new(
        email.server,
        email.login,
        email.password,
        email.folder,
        email.subject_token,
    )?;
    match mailbox.connect(&shutdown) {
        Ok(()) => {}
        Err(MailboxError::Interrupted) => {
            info!("Interrupted before the first connection, exiting");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    // With a sleep schedule the display starts blanked and the scheduler
    // powers it on once a message is presented inside awake hours.
    let power: Box<dyn PowerControl> = Box::new(DpmsPower);
    if screen.sleep_window.is_some() {
        if let Err(e) = power.set_display_power(false) {
            warn!("Could not blank the display at startup: {}", e);
        }
    }
    let scheduler = DisplayScheduler::new(screen.sleep_window, power);

    let transform = ImageMagickTransform::new(
        screen.width,
        screen.height,
        cache_root.join("display"),
    )?;
    let presenter = ViewerPresenter::new();
    let (interaction, prompt) = stdin_pair();

    let mut controller = SlideshowController::new(
        Box::new(mailbox),
        cache,
        scheduler,
        Box::new(transform),
        Box::new(presenter),
        Box::new(interaction),
        Box::new(prompt),
        screen.delay_secs,
        shutdown,
    );
    controller.run()
}
