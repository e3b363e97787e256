//! Shared test utilities for mailframe integration tests.
//!
//! This module provides:
//! - Scripted doubles for every collaborator the slideshow drives
//! - `MessageBuilder` for assembling fetched messages
//! - `FrameHarness` for isolated controller wiring over a temp cache

pub mod builders;
pub mod doubles;
pub mod harness;

pub use builders::MessageBuilder;
pub use doubles::*;
pub use harness::{Frame, FrameHarness};
