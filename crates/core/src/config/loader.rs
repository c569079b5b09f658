//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, ErrorCode, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from a file path or use defaults
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path.map(String::from).or_else(|| {
            find_config_file(&[
                ".buildplan.toml",
                "buildplan.toml",
                ".config/buildplan.toml",
            ])
        });

        let schema = match config_path {
            Some(ref p) if Path::new(p).exists() => load_file(Path::new(p))?,
            Some(ref p) => return Err(Error::config_not_found(p)),
            None => ConfigSchema::default(),
        };
        schema.validate().map_err(|e| {
            Error::new(ErrorCode::InvalidConfigValue, e.message)
                .with_context(format!("Checking {}", config_path.as_deref().unwrap_or("defaults")))
        })?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }

    /// Load with defaults only (no file)
    pub fn default() -> Self {
        Self {
            schema: ConfigSchema::default(),
            path: None,
        }
    }
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Find the first existing configuration file among the candidates
pub fn find_config_file(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(|candidate| candidate.to_string())
}

/// Read and parse a TOML or JSON file into `T`
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::from(e).with_context(format!("Failed to read config file {}", path.display()))
    })?;

    parse_str(&content, ConfigFormat::from_path(path))
        .map_err(|e| e.with_context(format!("Failed to parse config file {}", path.display())))
}

/// Parse configuration text in the given format
pub fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T> {
    match format {
        ConfigFormat::Toml => Ok(toml::from_str(content)?),
        ConfigFormat::Json => Ok(serde_json::from_str(content)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.general.format, "text");
        assert_eq!(config.schema.logging.level, "warn");
    }

    #[test]
    fn test_config_explicit_missing_file() {
        let err = Config::load(Some("/nonexistent/buildplan.toml")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_config_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[general]\nformat = \"json\"\n\n[registry]\nlocal_properties = \"android/local.properties\""
        )
        .unwrap();

        let config = Config::load(file.path().to_str()).unwrap();
        assert_eq!(config.schema.general.format, "json");
        assert_eq!(
            config.schema.general.module_file,
            "android/app/build.gradle.kts"
        );
        assert_eq!(
            config.schema.registry.local_properties.as_deref(),
            Some("android/local.properties")
        );
    }

    #[test]
    fn test_config_rejects_unknown_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[general]\nformat = \"yaml\"").unwrap();

        let err = Config::load(file.path().to_str()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert!(err.message.contains("general.format"));
        assert_eq!(err.exit_code(), crate::error::exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_load_file_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"logging": {{"level": "debug"}}}}"#).unwrap();

        let schema: ConfigSchema = load_file(file.path()).unwrap();
        assert_eq!(schema.logging.level, "debug");
    }

    #[test]
    fn test_parse_error_code() {
        let err = parse_str::<ConfigSchema>("[general", ConfigFormat::Toml).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a")), ConfigFormat::Toml);
    }
}
