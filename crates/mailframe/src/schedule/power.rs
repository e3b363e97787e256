use std::io;
use std::process::Command;

/// Turns the physical display on or off.
pub trait PowerControl: Send {
    fn set_display_power(&self, on: bool) -> io::Result<()>;
}

/// Drives the display through DPMS via `xset`.
pub struct DpmsPower;

impl PowerControl for DpmsPower {
    fn set_display_power(&self, on: bool) -> io::Result<()> {
        let mode = if on { "on" } else { "off" };
        let status = Command::new("xset")
            .args(["dpms", "force", mode])
            .status()?;
        if !status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("xset dpms force {} exited with {}", mode, status),
            ));
        }
        Ok(())
    }
}
