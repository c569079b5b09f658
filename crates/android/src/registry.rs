//! Toolchain version registry
//!
//! Supplies the framework's version metadata (`flutter.minSdkVersion`,
//! `flutter.versionCode`, ...) and the BoM catalog used to pin
//! platform-managed dependencies.

use buildplan_core::config::{load_file, parse_str, ConfigFormat};
use buildplan_core::error::{Error, ErrorCode, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Framework default `minSdkVersion`
pub const DEFAULT_MIN_SDK: u32 = 21;
/// Framework default `targetSdkVersion`
pub const DEFAULT_TARGET_SDK: u32 = 36;
/// Framework default `compileSdkVersion`
pub const DEFAULT_COMPILE_SDK: u32 = 36;
/// Framework default `ndkVersion`
pub const DEFAULT_NDK_VERSION: &str = "27.0.12077973";

/// Version metadata published by the framework's Gradle plugin
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkDefaults {
    #[serde(default)]
    pub ndk_version: Option<String>,
    #[serde(default)]
    pub min_sdk_version: Option<u32>,
    #[serde(default)]
    pub target_sdk_version: Option<u32>,
    #[serde(default)]
    pub compile_sdk_version: Option<u32>,
    #[serde(default)]
    pub version_code: Option<u32>,
    #[serde(default)]
    pub version_name: Option<String>,
}

impl FrameworkDefaults {
    /// Values the framework ships with when `local.properties` says nothing
    pub fn builtin() -> Self {
        Self {
            ndk_version: Some(DEFAULT_NDK_VERSION.to_string()),
            min_sdk_version: Some(DEFAULT_MIN_SDK),
            target_sdk_version: Some(DEFAULT_TARGET_SDK),
            compile_sdk_version: Some(DEFAULT_COMPILE_SDK),
            version_code: Some(1),
            version_name: Some("1.0".to_string()),
        }
    }

    /// Overlay every value set in `other`
    pub fn merge(&mut self, other: FrameworkDefaults) {
        if other.ndk_version.is_some() {
            self.ndk_version = other.ndk_version;
        }
        if other.min_sdk_version.is_some() {
            self.min_sdk_version = other.min_sdk_version;
        }
        if other.target_sdk_version.is_some() {
            self.target_sdk_version = other.target_sdk_version;
        }
        if other.compile_sdk_version.is_some() {
            self.compile_sdk_version = other.compile_sdk_version;
        }
        if other.version_code.is_some() {
            self.version_code = other.version_code;
        }
        if other.version_name.is_some() {
            self.version_name = other.version_name;
        }
    }
}

/// A framework property value looked up by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkValue {
    Int(u32),
    Text(String),
}

/// Artifact versions pinned by each BoM release
///
/// Keyed by BoM coordinate (`group:artifact`), then BoM version, then artifact id.
pub type BomCatalog = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// On-disk registry file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub framework: FrameworkDefaults,
    #[serde(default)]
    pub boms: BomCatalog,
}

/// The registry consulted during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainRegistry {
    pub framework: FrameworkDefaults,
    pub boms: BomCatalog,
    /// Framework SDK location from `local.properties`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_path: Option<String>,
}

impl Default for ToolchainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolchainRegistry {
    /// Registry with the framework's shipped defaults and an empty BoM catalog
    pub fn builtin() -> Self {
        Self {
            framework: FrameworkDefaults::builtin(),
            boms: BomCatalog::new(),
            sdk_path: None,
        }
    }

    /// Registry with no defaults at all
    pub fn empty() -> Self {
        Self {
            framework: FrameworkDefaults::default(),
            boms: BomCatalog::new(),
            sdk_path: None,
        }
    }

    /// Overlay a registry file
    pub fn with_file(mut self, file: RegistryFile) -> Self {
        self.framework.merge(file.framework);
        for (bom, releases) in file.boms {
            let entry = self.boms.entry(bom).or_default();
            for (version, pins) in releases {
                entry.entry(version).or_default().extend(pins);
            }
        }
        self
    }

    /// Load and overlay a TOML or JSON registry file
    pub fn load_file(self, path: &Path) -> Result<Self> {
        let file: RegistryFile =
            load_file(path).context(format!("Loading registry {}", path.display()))?;
        Ok(self.with_file(file))
    }

    /// Overlay the `flutter.*` keys of a `local.properties` file
    pub fn load_local_properties(self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e).with_context(format!("Reading {}", path.display()))
        })?;
        self.with_local_properties(&content)
    }

    /// Overlay the `flutter.*` keys of `local.properties` content
    pub fn with_local_properties(mut self, content: &str) -> Result<Self> {
        let properties = parse_properties(content);
        let mut overlay = FrameworkDefaults::default();

        if let Some(code) = properties.get("flutter.versionCode") {
            overlay.version_code = Some(parse_property_u32("flutter.versionCode", code)?);
        }
        if let Some(name) = properties.get("flutter.versionName") {
            overlay.version_name = Some(name.clone());
        }
        if let Some(min_sdk) = properties.get("flutter.minSdkVersion") {
            overlay.min_sdk_version = Some(parse_property_u32("flutter.minSdkVersion", min_sdk)?);
        }
        if let Some(sdk) = properties.get("flutter.sdk") {
            self.sdk_path = Some(sdk.clone());
        }

        self.framework.merge(overlay);
        Ok(self)
    }

    /// Look up a framework property by its Gradle name (`minSdkVersion`, ...)
    pub fn property(&self, name: &str) -> Option<FrameworkValue> {
        let fw = &self.framework;
        match name {
            "ndkVersion" => fw.ndk_version.clone().map(FrameworkValue::Text),
            "minSdkVersion" => fw.min_sdk_version.map(FrameworkValue::Int),
            "targetSdkVersion" => fw.target_sdk_version.map(FrameworkValue::Int),
            "compileSdkVersion" => fw.compile_sdk_version.map(FrameworkValue::Int),
            "versionCode" => fw.version_code.map(FrameworkValue::Int),
            "versionName" => fw.version_name.clone().map(FrameworkValue::Text),
            _ => None,
        }
    }

    /// Version a BoM release pins for an artifact of its group
    pub fn bom_pin(&self, bom: &str, bom_version: &str, artifact: &str) -> Option<&str> {
        self.boms
            .get(bom)
            .and_then(|releases| releases.get(bom_version))
            .and_then(|pins| pins.get(artifact))
            .map(String::as_str)
    }
}

/// Parse Java `.properties` content into key/value pairs
///
/// Handles `=` and `:` separators, `#`/`!` comments, and backslash escapes.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = find_separator(line)?;
            let key = unescape(line[..split].trim());
            let value = unescape(line[split + 1..].trim());
            Some((key, value))
        })
        .collect()
}

fn find_separator(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '=' | ':' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_property_u32(key: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| {
        Error::new(
            ErrorCode::InvalidConfigValue,
            format!("{} must be a non-negative integer, got '{}'", key, value),
        )
        .with_suggestion("Check the version in pubspec.yaml and rerun `flutter pub get`")
    })
}

/// Parse registry text directly (used by tests and embedded registries)
pub fn parse_registry(content: &str, format: ConfigFormat) -> Result<RegistryFile> {
    parse_str(content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_defaults() {
        let registry = ToolchainRegistry::builtin();
        assert_eq!(
            registry.property("minSdkVersion"),
            Some(FrameworkValue::Int(21))
        );
        assert_eq!(
            registry.property("ndkVersion"),
            Some(FrameworkValue::Text(DEFAULT_NDK_VERSION.to_string()))
        );
        assert_eq!(registry.property("unknown"), None);
    }

    #[test]
    fn test_empty_registry_has_no_properties() {
        let registry = ToolchainRegistry::empty();
        assert_eq!(registry.property("versionCode"), None);
    }

    #[test]
    fn test_local_properties_overlay() {
        let registry = ToolchainRegistry::builtin()
            .with_local_properties(
                "# generated\nsdk.dir=/opt/android\nflutter.sdk=C\\:\\\\src\\\\flutter\nflutter.versionName=2.3.1\nflutter.versionCode=42\n",
            )
            .unwrap();

        assert_eq!(registry.property("versionCode"), Some(FrameworkValue::Int(42)));
        assert_eq!(
            registry.property("versionName"),
            Some(FrameworkValue::Text("2.3.1".to_string()))
        );
        assert_eq!(registry.sdk_path.as_deref(), Some("C:\\src\\flutter"));
        assert_eq!(registry.property("minSdkVersion"), Some(FrameworkValue::Int(21)));
    }

    #[test]
    fn test_local_properties_bad_version_code() {
        let err = ToolchainRegistry::builtin()
            .with_local_properties("flutter.versionCode=abc")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }

    #[test]
    fn test_registry_file_overlay() {
        let file = parse_registry(
            r#"
            [framework]
            minSdkVersion = 24

            [boms."com.google.firebase:firebase-bom"."34.8.0"]
            firebase-auth = "24.0.1"
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let registry = ToolchainRegistry::builtin().with_file(file);
        assert_eq!(registry.property("minSdkVersion"), Some(FrameworkValue::Int(24)));
        assert_eq!(registry.property("targetSdkVersion"), Some(FrameworkValue::Int(36)));
        assert_eq!(
            registry.bom_pin("com.google.firebase:firebase-bom", "34.8.0", "firebase-auth"),
            Some("24.0.1")
        );
        assert_eq!(
            registry.bom_pin("com.google.firebase:firebase-bom", "34.7.0", "firebase-auth"),
            None
        );
    }

    #[test]
    fn test_load_registry_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"framework": {{"ndkVersion": "26.1.10909125"}}}}"#).unwrap();

        let registry = ToolchainRegistry::builtin().load_file(file.path()).unwrap();
        assert_eq!(
            registry.property("ndkVersion"),
            Some(FrameworkValue::Text("26.1.10909125".to_string()))
        );
    }

    #[test]
    fn test_parse_properties_separators() {
        let props = parse_properties("a=1\nb: 2\n! comment\nc\\=d=3\nnovalue");
        assert_eq!(props.get("a").map(String::as_str), Some("1"));
        assert_eq!(props.get("b").map(String::as_str), Some("2"));
        assert_eq!(props.get("c=d").map(String::as_str), Some("3"));
        assert!(!props.contains_key("novalue"));
    }
}
