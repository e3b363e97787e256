//! External media transform.
//!
//! Cached originals are never modified; each presentation renders a staged
//! copy sized for the screen and stamped with the sender annotation. The
//! production implementation shells out to ImageMagick.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local};
use log::debug;
use thiserror::Error;

/// Errors from staging a transformed asset.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Failed to create staging directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source path '{0}' has no filename")]
    MissingFilename(PathBuf),

    #[error("Failed to run convert: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("convert exited with {status}: {stderr}")]
    CommandFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Sender details stamped onto each slide.
#[derive(Debug, Clone)]
pub struct SlideMeta {
    pub sender_address: String,
    pub sender_name: Option<String>,
    pub date: Option<DateTime<Local>>,
}

impl SlideMeta {
    /// The annotation line rendered onto the slide. Without a date the
    /// line carries only the sender part.
    pub fn annotation(&self) -> String {
        let sender = format!(
            "Sent by: {} via {}",
            self.sender_name.as_deref().unwrap_or(""),
            self.sender_address
        );
        match &self.date {
            Some(date) => format!(
                "{} on {} at {}",
                sender,
                date.format("%m/%d/%Y"),
                date.format("%H:%M")
            ),
            None => sender,
        }
    }
}

/// Produces a display-ready asset from a cached original.
pub trait MediaTransform: Send {
    fn prepare(&self, source: &Path, meta: &SlideMeta) -> Result<PathBuf, TransformError>;
}

/// ImageMagick-backed transform: resize, letterbox onto black, annotate.
pub struct ImageMagickTransform {
    width: u32,
    height: u32,
    staging_dir: PathBuf,
}

impl ImageMagickTransform {
    pub fn new<P: AsRef<Path>>(
        width: u32,
        height: u32,
        staging_dir: P,
    ) -> Result<Self, TransformError> {
        let staging_dir = staging_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&staging_dir).map_err(|e| TransformError::CreateDirectory {
            path: staging_dir.clone(),
            source: e,
        })?;
        Ok(Self {
            width,
            height,
            staging_dir,
        })
    }
}

impl MediaTransform for ImageMagickTransform {
    fn prepare(&self, source: &Path, meta: &SlideMeta) -> Result<PathBuf, TransformError> {
        let staged = self.staging_dir.join(staged_filename(source)?);
        let args = convert_args(source, &staged, self.width, self.height, &meta.annotation());

        debug!("Transforming {} -> {}", source.display(), staged.display());

        let output = Command::new("convert").args(&args).output()?;
        if !output.status.success() {
            return Err(TransformError::CommandFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(staged)
    }
}

/// Staged copies keep the cache filename; HEIC becomes PNG because the
/// converter cannot encode HEIC output.
fn staged_filename(source: &Path) -> Result<String, TransformError> {
    let name = source
        .file_name()
        .ok_or_else(|| TransformError::MissingFilename(source.to_path_buf()))?
        .to_string_lossy()
        .into_owned();
    match name.strip_suffix(".heic") {
        Some(stem) => Ok(format!("{}.png", stem)),
        None => Ok(name),
    }
}

/// The device's exact convert pipeline: resize into the screen geometry,
/// center on a black extent, then a white SouthWest annotation.
fn convert_args(
    source: &Path,
    output: &Path,
    width: u32,
    height: u32,
    annotation: &str,
) -> Vec<OsString> {
    let geometry = format!("{}x{}", width, height);
    vec![
        source.as_os_str().to_os_string(),
        OsString::from("-resize"),
        OsString::from(&geometry),
        OsString::from("-gravity"),
        OsString::from("center"),
        OsString::from("-background"),
        OsString::from("black"),
        OsString::from("-extent"),
        OsString::from(&geometry),
        OsString::from("-gravity"),
        OsString::from("SouthWest"),
        OsString::from("-pointsize"),
        OsString::from("20"),
        OsString::from("-fill"),
        OsString::from("white"),
        OsString::from("-annotate"),
        OsString::from("+5+10"),
        OsString::from(annotation),
        output.as_os_str().to_os_string(),
    ]
}
