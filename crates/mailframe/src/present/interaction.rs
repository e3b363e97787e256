//! Interaction events and the disposition prompt.
//!
//! A reader thread forwards input lines over a channel. The interaction
//! source drains it non-blockingly during dwell polling; the prompt
//! consumes from the same channel when a disposition is requested, so the
//! two views never fight over stdin.

use std::io::BufRead;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};

use crate::mailbox::Disposition;

/// Non-blocking check for a pending user interaction.
pub trait InteractionSource: Send {
    /// Returns true when at least one interaction arrived since the last
    /// call, draining everything pending.
    fn interacted(&mut self) -> bool;
}

/// Blocking request for a disposition choice.
pub trait DispositionPrompt: Send {
    fn choose(&mut self) -> Disposition;
}

/// Interaction source fed by the stdin reader thread.
pub struct StdinInteraction {
    events: Receiver<String>,
}

impl StdinInteraction {
    fn from_receiver(events: Receiver<String>) -> Self {
        Self { events }
    }
}

impl InteractionSource for StdinInteraction {
    fn interacted(&mut self) -> bool {
        let mut any = false;
        while self.events.try_recv().is_ok() {
            any = true;
        }
        any
    }
}

/// Terminal disposition prompt fed by the stdin reader thread.
pub struct TerminalPrompt {
    lines: Receiver<String>,
}

impl TerminalPrompt {
    fn from_receiver(lines: Receiver<String>) -> Self {
        Self { lines }
    }
}

impl DispositionPrompt for TerminalPrompt {
    fn choose(&mut self) -> Disposition {
        println!("Delete, archive, or keep this message? [d/a/K]");
        match self.lines.recv() {
            Ok(line) => parse_choice(&line),
            Err(_) => {
                warn!("Input closed while awaiting a disposition, keeping the message");
                Disposition::Keep
            }
        }
    }
}

fn parse_choice(line: &str) -> Disposition {
    match line.trim().to_lowercase().as_str() {
        "d" | "delete" => Disposition::Delete,
        "a" | "archive" => Disposition::Archive,
        _ => Disposition::Keep,
    }
}

/// Spawns the stdin reader thread and returns the interaction source and
/// prompt sharing its line stream.
pub fn stdin_pair() -> (StdinInteraction, TerminalPrompt) {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || read_lines(tx));
    (
        StdinInteraction::from_receiver(rx.clone()),
        TerminalPrompt::from_receiver(rx),
    )
}

fn read_lines(tx: Sender<String>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        if tx.send(line).is_err() {
            break;
        }
    }
    debug!("Input reader finished");
}
