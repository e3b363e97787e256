pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod mailbox;
pub mod present;
pub mod schedule;
pub mod slideshow;
pub mod transform;

pub use cache::{AttachmentCache, CacheError, CacheKey, DiskGauge, DiskSpace, StatvfsGauge};
pub use config::{default_config_path, load_config, Config};
pub use error::{ConfigError, FrameError, Result};
pub use mailbox::{Disposition, Mailbox, MailboxError, MailboxSync};
pub use schedule::{DisplayScheduler, DisplayState, SleepWindow};
pub use slideshow::{CycleOutcome, SlideshowController};
pub use transform::{MediaTransform, SlideMeta, TransformError};
