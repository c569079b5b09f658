//! Configuration schema definitions
//!
//! Shape of the tool's own configuration file.

use crate::error::Result;
use crate::validation::Validator;
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub registry: RegistryConfig,
}

impl ConfigSchema {
    /// Check the values serde cannot constrain
    pub fn validate(&self) -> Result<()> {
        Validator::new()
            .required("general.module_file", &self.general.module_file)
            .one_of("general.format", &self.general.format, &["text", "json"])
            .validate()
            .to_result()
    }
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Module description used when none is given on the command line
    #[serde(default = "default_module_file")]
    pub module_file: String,

    /// Output format: text or json
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            module_file: default_module_file(),
            format: default_format(),
        }
    }
}

fn default_module_file() -> String {
    "android/app/build.gradle.kts".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit log lines as JSON objects
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Toolchain registry sources
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RegistryConfig {
    /// Registry file overriding the built-in framework defaults and BoM catalog
    #[serde(default)]
    pub path: Option<String>,

    /// `local.properties` file carrying `flutter.versionCode` / `flutter.versionName`
    #[serde(default)]
    pub local_properties: Option<String>,
}
