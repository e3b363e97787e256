use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use secrecy::SecretString;

use crate::config::schema::{Config, EmailConfig, RawConfig, ScreenConfig};
use crate::error::ConfigError;

/// Default config location: `~/photoframe.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join("photoframe.json"))
        .ok_or(ConfigError::NoHomeDirectory)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, path)
}

pub fn load_config_from_str(content: &str, path: &Path) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_json::from_str(content)?;
    validate_config(raw, path)
}

/// Every key of both sections must be present; `subject_pw`, `sleep` and
/// `awake` may be empty strings, which disables the feature they gate.
fn validate_config(raw: RawConfig, path: &Path) -> Result<Config, ConfigError> {
    let email = require(raw.email, "EMAIL", path)?;
    let screen = require(raw.screen, "SCREEN", path)?;

    let login = require(email.login, "EMAIL.login", path)?;
    let password = SecretString::from(require(email.password, "EMAIL.password", path)?);
    let server = require(email.server, "EMAIL.server", path)?;
    let folder = require(email.folder, "EMAIL.folder", path)?;
    let subject_pw = require(email.subject_pw, "EMAIL.subject_pw", path)?;
    let subject_token = if subject_pw.is_empty() {
        None
    } else {
        Some(subject_pw.to_lowercase())
    };

    let delay_secs = require(screen.delay, "SCREEN.delay", path)?;
    let sleep_raw = require(screen.sleep, "SCREEN.sleep", path)?;
    let awake_raw = require(screen.awake, "SCREEN.awake", path)?;
    let width = require(screen.width, "SCREEN.width", path)?;
    let height = require(screen.height, "SCREEN.height", path)?;

    let sleep = parse_optional_time(&sleep_raw, "SCREEN.sleep", path)?;
    let awake = parse_optional_time(&awake_raw, "SCREEN.awake", path)?;

    Ok(Config {
        email: EmailConfig {
            login,
            password,
            server,
            folder,
            subject_token,
        },
        screen: ScreenConfig {
            delay_secs,
            sleep_window: ScreenConfig::window_from(sleep, awake),
            width,
            height,
        },
    })
}

fn require<T>(value: Option<T>, key: &str, path: &Path) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingKey {
        key: key.to_string(),
        path: path.to_path_buf(),
    })
}

fn parse_optional_time(raw: &str, key: &str, path: &Path) -> Result<Option<NaiveTime>, ConfigError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            path: path.to_path_buf(),
            reason: format!("'{}' is not a HH:MM time", raw),
        })
}
