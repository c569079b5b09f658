//! Build types, variants and signing config binding
//!
//! Android always provides a `debug` signing config backed by the SDK's debug
//! keystore, plus `debug` and `release` build types.

use crate::error::{Violation, ViolationKind};
use crate::model::{AndroidBlock, BuildTypeSpec, SigningConfigSpec};
use crate::plan::Warning;
use buildplan_core::validation::Validator;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the implicit debug signing config and build type
pub const DEBUG: &str = "debug";
/// Name of the implicit release build type
pub const RELEASE: &str = "release";

/// Keystore used by the implicit debug signing config
pub const DEBUG_KEYSTORE: &str = "~/.android/debug.keystore";
const DEBUG_STORE_PASSWORD: &str = "android";
const DEBUG_KEY_ALIAS: &str = "androiddebugkey";

/// A complete set of signing credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    pub name: String,
    pub store_file: String,
    #[serde(serialize_with = "redact")]
    pub store_password: String,
    pub key_alias: String,
    #[serde(serialize_with = "redact")]
    pub key_password: String,
}

fn redact<S: Serializer>(_: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("********")
}

impl SigningConfig {
    /// The SDK debug keystore config
    pub fn debug_default() -> Self {
        Self {
            name: DEBUG.to_string(),
            store_file: DEBUG_KEYSTORE.to_string(),
            store_password: DEBUG_STORE_PASSWORD.to_string(),
            key_alias: DEBUG_KEY_ALIAS.to_string(),
            key_password: DEBUG_STORE_PASSWORD.to_string(),
        }
    }

    /// Whether this is the debug keystore config
    pub fn is_debug(&self) -> bool {
        self.name == DEBUG
    }
}

/// A build variant with its bound signing config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    pub signing_config: String,
    pub debuggable: bool,
    pub minify_enabled: bool,
    pub shrink_resources: bool,
}

/// Variants and the signing configs they bind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub variants: BTreeMap<String, Variant>,
    pub signing_configs: BTreeMap<String, SigningConfig>,
}

/// Bind every build type to a signing config
///
/// A build type without `signingConfig` falls back to `debug`.
pub fn bind(
    android: &AndroidBlock,
    violations: &mut Vec<Violation>,
    warnings: &mut Vec<Warning>,
) -> Bindings {
    let declared = &android.signing_configs;
    let mut bindings = Bindings::default();

    let mut names: BTreeSet<&str> = [DEBUG, RELEASE].into_iter().collect();
    names.extend(android.build_types.keys().map(String::as_str));

    for name in names {
        let spec = android.build_types.get(name).cloned().unwrap_or_default();
        let path = format!("android.buildTypes.{}", name);
        let variant = variant_for(name, &spec, &path, violations);

        let is_known = variant.signing_config == DEBUG || declared.contains_key(&variant.signing_config);
        if !is_known {
            violations.push(Violation::new(
                ViolationKind::UnresolvedSigningReference,
                format!("{}.signingConfig", path),
                format!(
                    "signing config '{}' is not declared in android.signingConfigs",
                    variant.signing_config
                ),
            ));
            continue;
        }

        if !bindings.signing_configs.contains_key(&variant.signing_config) {
            if let Some(config) =
                materialize(&variant.signing_config, declared.get(&variant.signing_config), violations)
            {
                bindings
                    .signing_configs
                    .insert(variant.signing_config.clone(), config);
            }
        }

        if !variant.debuggable && variant.signing_config == DEBUG {
            warnings.push(Warning {
                path: format!("{}.signingConfig", path),
                message: format!(
                    "non-debuggable variant '{}' is signed with the debug keystore",
                    name
                ),
            });
        }

        bindings.variants.insert(name.to_string(), variant);
    }

    bindings
}

fn variant_for(
    name: &str,
    spec: &BuildTypeSpec,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Variant {
    let minify_enabled = spec.minify_enabled.unwrap_or(false);
    let shrink_resources = spec.shrink_resources.unwrap_or(false);
    if shrink_resources && !minify_enabled {
        violations.push(Violation::new(
            ViolationKind::InvalidValue,
            format!("{}.isShrinkResources", path),
            "removing unused resources requires isMinifyEnabled = true",
        ));
    }

    Variant {
        name: name.to_string(),
        signing_config: spec
            .signing_config
            .clone()
            .unwrap_or_else(|| DEBUG.to_string()),
        debuggable: spec.debuggable.unwrap_or(name == DEBUG),
        minify_enabled,
        shrink_resources,
    }
}

/// Turn a declared config into complete credentials
///
/// `debug` starts from the SDK keystore and takes any declared overrides;
/// every other config must declare all four fields.
fn materialize(
    name: &str,
    spec: Option<&SigningConfigSpec>,
    violations: &mut Vec<Violation>,
) -> Option<SigningConfig> {
    let spec = spec.cloned().unwrap_or_default();

    if name == DEBUG {
        let base = SigningConfig::debug_default();
        return Some(SigningConfig {
            name: name.to_string(),
            store_file: spec.store_file.unwrap_or(base.store_file),
            store_password: spec.store_password.unwrap_or(base.store_password),
            key_alias: spec.key_alias.unwrap_or(base.key_alias),
            key_password: spec.key_password.unwrap_or(base.key_password),
        });
    }

    let result = Validator::new()
        .required("storeFile", spec.store_file.as_deref().unwrap_or(""))
        .required("storePassword", spec.store_password.as_deref().unwrap_or(""))
        .required("keyAlias", spec.key_alias.as_deref().unwrap_or(""))
        .required("keyPassword", spec.key_password.as_deref().unwrap_or(""))
        .validate();

    if !result.is_valid() {
        violations.extend(Violation::collect(
            &format!("android.signingConfigs.{}", name),
            result,
        ));
        return None;
    }

    Some(SigningConfig {
        name: name.to_string(),
        store_file: spec.store_file.unwrap_or_default(),
        store_password: spec.store_password.unwrap_or_default(),
        key_alias: spec.key_alias.unwrap_or_default(),
        key_password: spec.key_password.unwrap_or_default(),
    })
}
