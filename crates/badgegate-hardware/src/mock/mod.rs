//! Mock channel implementations for testing and development.
//!
//! This module provides a simulated reader link that can be controlled
//! programmatically without requiring physical hardware.

pub mod channel;

pub use channel::{MockBadgeChannel, MockBadgeChannelHandle};
