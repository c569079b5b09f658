//! Core utilities for the buildplan tools
//!
//! Shared functionality used by the resolver and the command line front end:
//!
//! - **Error handling**: coded errors with context and recovery suggestions
//! - **Configuration**: TOML/JSON loading with serde defaults
//! - **Validation**: field checks that accumulate every violation
//!
//! # Example
//!
//! ```rust,no_run
//! use buildplan_core::config::Config;
//!
//! let config = Config::load(None).expect("config");
//! println!("module: {}", config.schema.general.module_file);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};
