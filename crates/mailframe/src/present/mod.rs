//! Fullscreen presentation of staged assets.
//!
//! Images are handed to an external viewer that stays up for the dwell
//! (replaced per slide); videos run a player to completion, supervised at
//! the same tick rate the controller uses for interaction polling.

use std::path::Path;
use std::process::{Child, Command};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

pub mod interaction;

pub use interaction::{
    stdin_pair, DispositionPrompt, InteractionSource, StdinInteraction, TerminalPrompt,
};

/// Poll interval while supervising the video player.
const PLAYER_TICK: Duration = Duration::from_millis(100);

/// Errors from driving the external viewer/player.
#[derive(Error, Debug)]
pub enum PresentError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed {
        program: &'static str,
        status: std::process::ExitStatus,
    },

    #[error("IO error while supervising the player: {0}")]
    Io(#[from] std::io::Error),
}

/// Shows one asset at a time on the screen.
pub trait Presenter: Send {
    /// Puts an image on screen and returns immediately; the image stays
    /// up until the next call replaces it.
    fn show_image(&mut self, path: &Path) -> Result<(), PresentError>;

    /// Plays a video to completion. `interrupt` is polled every tick;
    /// when it returns true playback is stopped early and the call
    /// returns success.
    fn play_video(&mut self, path: &Path, interrupt: &mut dyn FnMut() -> bool)
        -> Result<(), PresentError>;
}

/// Production presenter driving `feh` for images and `mpv` for video.
pub struct ViewerPresenter {
    current_image: Option<Child>,
}

impl ViewerPresenter {
    pub fn new() -> Self {
        Self {
            current_image: None,
        }
    }

    fn close_current_image(&mut self) {
        if let Some(mut child) = self.current_image.take() {
            if let Err(e) = child.kill() {
                warn!("Failed to stop the image viewer: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl Default for ViewerPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for ViewerPresenter {
    fn show_image(&mut self, path: &Path) -> Result<(), PresentError> {
        self.close_current_image();

        debug!("Showing image {}", path.display());
        let child = Command::new("feh")
            .args(["--fullscreen", "--hide-pointer"])
            .arg(path)
            .spawn()
            .map_err(|e| PresentError::Launch {
                program: "feh",
                source: e,
            })?;
        self.current_image = Some(child);
        Ok(())
    }

    fn play_video(
        &mut self,
        path: &Path,
        interrupt: &mut dyn FnMut() -> bool,
    ) -> Result<(), PresentError> {
        self.close_current_image();

        debug!("Playing video {}", path.display());
        let mut child = Command::new("mpv")
            .args(["--fs", "--really-quiet"])
            .arg(path)
            .spawn()
            .map_err(|e| PresentError::Launch {
                program: "mpv",
                source: e,
            })?;

        loop {
            if let Some(status) = child.try_wait()? {
                if !status.success() {
                    return Err(PresentError::Failed {
                        program: "mpv",
                        status,
                    });
                }
                return Ok(());
            }
            if interrupt() {
                debug!("Video playback interrupted");
                if let Err(e) = child.kill() {
                    warn!("Failed to stop the video player: {}", e);
                }
                let _ = child.wait();
                return Ok(());
            }
            std::thread::sleep(PLAYER_TICK);
        }
    }
}

impl Drop for ViewerPresenter {
    fn drop(&mut self) {
        self.close_current_image();
    }
}
