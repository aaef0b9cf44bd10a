//! Output utilities for CLI commands
//!
//! Color helpers and centralized error presentation.

pub mod colors;
pub mod errors;

pub use colors::{action_style, probe_style};
pub use errors::show_error;
