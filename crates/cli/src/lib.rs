//! CLI utilities for the buildplan tools
//!
//! Provides shared CLI functionality:
//! - Status messages
//! - Terminal formatting helpers

pub mod output;
