//! Daily display schedule: a sleep window during which the screen is
//! blanked and the slideshow holds.

use chrono::NaiveTime;

pub mod power;

pub use power::{DpmsPower, PowerControl};

/// Daily interval during which the display sleeps. `start` is the
/// sleep time, `end` the wake time; the window may wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SleepWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `now` falls inside the window. A window whose end
    /// precedes its start spans midnight: 23:00..07:00 contains 23:30
    /// and 06:59 but not 12:00. A degenerate window (start == end)
    /// contains nothing.
    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= now && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Awake,
    Asleep,
}

/// Tracks display state against the configured window and switches the
/// screen power on transitions.
///
/// Without a window the display is considered permanently awake and the
/// power control is never touched.
pub struct DisplayScheduler {
    window: Option<SleepWindow>,
    state: DisplayState,
    power: Box<dyn PowerControl>,
}

impl DisplayScheduler {
    /// With a window configured the scheduler starts `Asleep`, so the
    /// first tick inside awake hours powers the display on. The caller
    /// blanks the screen at startup to match.
    pub fn new(window: Option<SleepWindow>, power: Box<dyn PowerControl>) -> Self {
        let state = if window.is_some() {
            DisplayState::Asleep
        } else {
            DisplayState::Awake
        };
        Self {
            window,
            state,
            power,
        }
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn is_awake(&self) -> bool {
        self.state == DisplayState::Awake
    }

    /// Re-evaluates the schedule for `now` and returns the resulting
    /// state. The display power is switched exactly once per transition;
    /// a failure to switch is logged and the state still advances.
    pub fn tick(&mut self, now: NaiveTime) -> DisplayState {
        let desired = match &self.window {
            Some(w) if w.contains(now) => DisplayState::Asleep,
            _ => DisplayState::Awake,
        };

        if desired != self.state {
            match desired {
                DisplayState::Asleep => {
                    log::info!("Entering sleep window, turning the display off");
                    if let Err(e) = self.power.set_display_power(false) {
                        log::warn!("Failed to turn the display off: {}", e);
                    }
                }
                DisplayState::Awake => {
                    log::info!("Sleep window over, turning the display on");
                    if let Err(e) = self.power.set_display_power(true) {
                        log::warn!("Failed to turn the display on: {}", e);
                    }
                }
            }
            self.state = desired;
        }

        self.state
    }
}
