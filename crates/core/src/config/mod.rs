//! Configuration loading and schema definitions
//!
//! Shared configuration types and the TOML/JSON file loader used for both the
//! tool configuration and module descriptions.

mod loader;
mod schema;

pub use loader::{find_config_file, load_file, parse_str, Config, ConfigFormat};
pub use schema::*;
