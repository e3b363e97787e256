//! Config file schema: the raw deserialized shape and the validated form
//! the rest of the crate consumes.

use chrono::NaiveTime;
use secrecy::SecretString;
use serde::Deserialize;

use crate::schedule::SleepWindow;

/// Raw config file: two sections, every key optional so the loader can
/// report exactly which one is missing.
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    #[serde(rename = "EMAIL")]
    pub email: Option<RawEmailSection>,
    #[serde(rename = "SCREEN")]
    pub screen: Option<RawScreenSection>,
}

#[derive(Debug, Deserialize)]
pub struct RawEmailSection {
    pub login: Option<String>,
    pub password: Option<String>,
    pub server: Option<String>,
    pub folder: Option<String>,
    pub subject_pw: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawScreenSection {
    pub delay: Option<u32>,
    pub sleep: Option<String>,
    pub awake: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Validated mailbox settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub login: String,
    pub password: SecretString,
    pub server: String,
    pub folder: String,
    /// Lowercased subject token; `None` when the gate is disabled by an
    /// empty `subject_pw`.
    pub subject_token: Option<String>,
}

/// Validated screen settings.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Dwell per image, in seconds.
    pub delay_secs: u32,
    /// Present only when both `sleep` and `awake` are non-empty.
    pub sleep_window: Option<SleepWindow>,
    pub width: u32,
    pub height: u32,
}

/// The full validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub email: EmailConfig,
    pub screen: ScreenConfig,
}

impl ScreenConfig {
    /// Builds the optional schedule from the two parsed times; the
    /// schedule only exists when both ends are configured.
    pub fn window_from(sleep: Option<NaiveTime>, awake: Option<NaiveTime>) -> Option<SleepWindow> {
        match (sleep, awake) {
            (Some(start), Some(end)) => Some(SleepWindow::new(start, end)),
            _ => None,
        }
    }
}
