//! Declarative module description
//!
//! The input tree handed to the resolver. Field names follow the Gradle DSL
//! (`compileSdk`, `defaultConfig`, `isMinifyEnabled`, ...) so TOML and JSON
//! descriptions read like the `build.gradle.kts` they stand in for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of values that refer to the framework's version metadata
pub const FRAMEWORK_REF_PREFIX: &str = "flutter.";

/// A complete application module description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    /// Plugins in application order
    #[serde(default)]
    pub plugins: Vec<PluginRef>,

    #[serde(default)]
    pub android: AndroidBlock,

    /// The framework extension block (`flutter { source = "../.." }`)
    #[serde(default)]
    pub flutter: Option<FlutterBlock>,

    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// A plugin reference, written either as a bare id or as a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PluginRefRepr")]
pub struct PluginRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PluginRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PluginRefRepr {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        version: Option<String>,
    },
}

impl From<PluginRefRepr> for PluginRef {
    fn from(repr: PluginRefRepr) -> Self {
        match repr {
            PluginRefRepr::Id(id) => Self { id, version: None },
            PluginRefRepr::Full { id, version } => Self { id, version },
        }
    }
}

/// An integer setting: a literal or a `flutter.<property>` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntValue {
    Literal(i64),
    Reference(String),
}

impl From<i64> for IntValue {
    fn from(value: i64) -> Self {
        Self::Literal(value)
    }
}

/// The `android { }` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidBlock {
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default, alias = "compileSdkVersion")]
    pub compile_sdk: Option<IntValue>,

    #[serde(default)]
    pub ndk_version: Option<String>,

    #[serde(default)]
    pub compile_options: CompileOptions,

    #[serde(default)]
    pub kotlin_options: KotlinOptions,

    #[serde(default)]
    pub default_config: DefaultConfig,

    #[serde(default)]
    pub build_types: BTreeMap<String, BuildTypeSpec>,

    #[serde(default)]
    pub signing_configs: BTreeMap<String, SigningConfigSpec>,
}

/// Java source/target compatibility
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    #[serde(default)]
    pub source_compatibility: Option<String>,
    #[serde(default)]
    pub target_compatibility: Option<String>,
}

/// Kotlin compiler options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KotlinOptions {
    #[serde(default)]
    pub jvm_target: Option<String>,
}

/// The `defaultConfig { }` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConfig {
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default, alias = "minSdkVersion")]
    pub min_sdk: Option<IntValue>,
    #[serde(default, alias = "targetSdkVersion")]
    pub target_sdk: Option<IntValue>,
    #[serde(default)]
    pub version_code: Option<IntValue>,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub multi_dex_enabled: Option<bool>,
}

/// A build type (`debug`, `release`, or custom)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTypeSpec {
    /// Name of the signing config this build type uses
    #[serde(default)]
    pub signing_config: Option<String>,
    #[serde(default, alias = "isMinifyEnabled")]
    pub minify_enabled: Option<bool>,
    #[serde(default, alias = "isShrinkResources")]
    pub shrink_resources: Option<bool>,
    #[serde(default, alias = "isDebuggable")]
    pub debuggable: Option<bool>,
}

/// Keystore credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfigSpec {
    #[serde(default)]
    pub store_file: Option<String>,
    #[serde(default)]
    pub store_password: Option<String>,
    #[serde(default)]
    pub key_alias: Option<String>,
    #[serde(default)]
    pub key_password: Option<String>,
}

/// The framework extension block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlutterBlock {
    #[serde(default)]
    pub source: Option<String>,
}

/// One entry of the `dependencies { }` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DependencySpecRepr")]
pub struct DependencySpec {
    /// Gradle configuration (`implementation`, `api`, ...)
    pub configuration: String,
    /// `group:artifact[:version]`
    pub notation: String,
    /// Wrapped in `platform(...)`: a BoM
    pub platform: bool,
}

impl DependencySpec {
    pub fn implementation(notation: impl Into<String>) -> Self {
        Self {
            configuration: default_configuration(),
            notation: notation.into(),
            platform: false,
        }
    }

    pub fn platform(notation: impl Into<String>) -> Self {
        Self {
            platform: true,
            ..Self::implementation(notation)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencySpecRepr {
    Notation(String),
    Full {
        #[serde(default = "default_configuration")]
        configuration: String,
        notation: String,
        #[serde(default)]
        platform: bool,
    },
}

impl From<DependencySpecRepr> for DependencySpec {
    fn from(repr: DependencySpecRepr) -> Self {
        match repr {
            DependencySpecRepr::Notation(notation) => Self::implementation(notation),
            DependencySpecRepr::Full {
                configuration,
                notation,
                platform,
            } => Self {
                configuration,
                notation,
                platform,
            },
        }
    }
}

fn default_configuration() -> String {
    "implementation".to_string()
}

/// Normalize a Java/JVM version spelling to its short form
///
/// Accepts `JavaVersion.VERSION_17`, `VERSION_1_8`, `JvmTarget.JVM_17`, `17`, `1.8`.
pub fn normalize_java_version(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".toString()").unwrap_or(trimmed);
    let tail = trimmed
        .strip_prefix("JavaVersion.")
        .or_else(|| trimmed.strip_prefix("JvmTarget."))
        .unwrap_or(trimmed);
    let tail = tail
        .strip_prefix("VERSION_")
        .or_else(|| tail.strip_prefix("JVM_"))
        .unwrap_or(tail);
    tail.replace('_', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_java_version() {
        assert_eq!(normalize_java_version("JavaVersion.VERSION_17"), "17");
        assert_eq!(normalize_java_version("VERSION_1_8"), "1.8");
        assert_eq!(normalize_java_version("JvmTarget.JVM_21"), "21");
        assert_eq!(normalize_java_version("JavaVersion.VERSION_17.toString()"), "17");
        assert_eq!(normalize_java_version("11"), "11");
    }

    #[test]
    fn test_module_from_toml() {
        let spec: ModuleSpec = toml::from_str(
            r#"
            plugins = ["com.android.application", { id = "dev.flutter.flutter-gradle-plugin" }]
            dependencies = [
                "androidx.multidex:multidex:2.0.1",
                { notation = "com.google.firebase:firebase-bom:34.8.0", platform = true },
            ]

            [android]
            namespace = "com.example.app"
            compileSdk = 36

            [android.defaultConfig]
            minSdk = "flutter.minSdkVersion"
            targetSdk = 36

            [android.buildTypes.release]
            signingConfig = "debug"
            isMinifyEnabled = false
            "#,
        )
        .unwrap();

        assert_eq!(spec.plugins.len(), 2);
        assert_eq!(spec.plugins[1].id, "dev.flutter.flutter-gradle-plugin");
        assert_eq!(spec.android.compile_sdk, Some(IntValue::Literal(36)));
        assert_eq!(
            spec.android.default_config.min_sdk,
            Some(IntValue::Reference("flutter.minSdkVersion".to_string()))
        );
        assert_eq!(spec.dependencies[0].configuration, "implementation");
        assert!(spec.dependencies[1].platform);
        let release = &spec.android.build_types["release"];
        assert_eq!(release.signing_config.as_deref(), Some("debug"));
        assert_eq!(release.minify_enabled, Some(false));
    }

    #[test]
    fn test_module_from_json() {
        let spec: ModuleSpec = serde_json::from_str(
            r#"{
                "plugins": ["com.android.application"],
                "android": { "defaultConfig": { "applicationId": "com.example.app", "minSdk": -3 } }
            }"#,
        )
        .unwrap();
        assert_eq!(spec.android.default_config.min_sdk, Some(IntValue::Literal(-3)));
        assert!(spec.flutter.is_none());
    }
}
