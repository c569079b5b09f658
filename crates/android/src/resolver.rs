//! Module resolution
//!
//! Turns a [`ModuleSpec`] into a [`BuildPlan`]:
//!
//! 1. Fill values the module leaves out from the framework's version metadata
//! 2. Pin unversioned dependencies through their platform BoM
//! 3. Check `minSdk <= targetSdk <= compileSdk`
//! 4. Bind every build variant to a signing config
//!
//! Every stage runs even when an earlier one failed, so the returned
//! [`ConfigError`] lists all violations at once.

use crate::dependency;
use crate::error::{ConfigError, Violation, ViolationKind};
use crate::model::{normalize_java_version, IntValue, ModuleSpec, FRAMEWORK_REF_PREFIX};
use crate::plan::{BuildConfig, BuildPlan, JvmTargets, Warning};
use crate::plugins;
use crate::registry::{FrameworkValue, ToolchainRegistry};
use crate::signing;
use buildplan_core::validation::Validator;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

static REVERSE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$")
        .expect("valid reverse-domain regex")
});

/// Google Play rejects version codes above this
pub const MAX_VERSION_CODE: u32 = 2_100_000_000;

const DEFAULT_JAVA_VERSION: &str = "1.8";
const MULTIDEX_COORDINATE: &str = "androidx.multidex:multidex";
const NATIVE_MULTIDEX_MIN_SDK: u32 = 21;

/// Resolves modules against a toolchain registry
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    registry: &'a ToolchainRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a ToolchainRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a module, or report every violation found
    #[instrument(skip_all, fields(plugins = spec.plugins.len(), dependencies = spec.dependencies.len()))]
    pub fn resolve(&self, spec: &ModuleSpec) -> Result<BuildPlan, ConfigError> {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        violations.extend(plugins::check_order(&spec.plugins));
        debug!(violations = violations.len(), "checked plugin order");

        let android = &spec.android;
        let defaults = &android.default_config;

        let namespace = android.namespace.clone();
        if let Some(ns) = &namespace {
            violations.extend(Violation::collect(
                "android",
                Validator::new()
                    .pattern("namespace", ns, &REVERSE_DOMAIN, "a reverse-domain identifier")
                    .validate(),
            ));
        }

        let application_id = match (&defaults.application_id, &namespace) {
            (Some(id), _) => {
                violations.extend(Violation::collect(
                    "android.defaultConfig",
                    Validator::new()
                        .pattern(
                            "applicationId",
                            id,
                            &REVERSE_DOMAIN,
                            "a reverse-domain identifier",
                        )
                        .validate(),
                ));
                Some(id.clone())
            }
            // already checked as the namespace
            (None, Some(ns)) => Some(ns.clone()),
            (None, None) => {
                violations.push(Violation::new(
                    ViolationKind::MissingField,
                    "android.defaultConfig.applicationId",
                    "no applicationId and no namespace to fall back on",
                ));
                None
            }
        };

        let compile_sdk = self.int_field(
            "android.compileSdk",
            android.compile_sdk.as_ref(),
            "compileSdkVersion",
            &mut violations,
        );
        let min_sdk = self.int_field(
            "android.defaultConfig.minSdk",
            defaults.min_sdk.as_ref(),
            "minSdkVersion",
            &mut violations,
        );
        let target_sdk = self.int_field(
            "android.defaultConfig.targetSdk",
            defaults.target_sdk.as_ref(),
            "targetSdkVersion",
            &mut violations,
        );
        let version_code = self.int_field(
            "android.defaultConfig.versionCode",
            defaults.version_code.as_ref(),
            "versionCode",
            &mut violations,
        );
        if let Some(code) = version_code {
            violations.extend(Violation::collect(
                "android.defaultConfig",
                Validator::new()
                    .range("versionCode", code, 0, MAX_VERSION_CODE)
                    .validate(),
            ));
        }

        let version_name = self.text_field(
            "android.defaultConfig.versionName",
            defaults.version_name.as_deref(),
            "versionName",
            &mut violations,
        );
        if let Some(name) = &version_name {
            violations.extend(Violation::collect(
                "android.defaultConfig",
                Validator::new().required("versionName", name).validate(),
            ));
        }

        let ndk_version = match android.ndk_version.as_deref() {
            Some(raw) => self.text_field("android.ndkVersion", Some(raw), "ndkVersion", &mut violations),
            None => self.framework_text("ndkVersion"),
        };
        debug!(?min_sdk, ?target_sdk, ?compile_sdk, "applied framework defaults");

        let dependencies = dependency::resolve(&spec.dependencies, self.registry, &mut violations);
        debug!(resolved = dependencies.len(), "pinned dependency versions");

        if let (Some(min), Some(target), Some(compile)) = (min_sdk, target_sdk, compile_sdk) {
            if min > target {
                violations.push(Violation::new(
                    ViolationKind::SdkOrdering,
                    "android.defaultConfig.minSdk",
                    format!("minSdk {} is greater than targetSdk {}", min, target),
                ));
            }
            if target > compile {
                violations.push(Violation::new(
                    ViolationKind::SdkOrdering,
                    "android.defaultConfig.targetSdk",
                    format!("targetSdk {} is greater than compileSdk {}", target, compile),
                ));
            }
        }

        let bindings = signing::bind(android, &mut violations, &mut warnings);
        debug!(variants = bindings.variants.len(), "bound signing configs");

        let flutter_source = spec.flutter.as_ref().and_then(|f| f.source.clone());
        if plugins::applies_framework(&spec.plugins) && flutter_source.is_none() {
            violations.push(Violation::new(
                ViolationKind::MissingField,
                "flutter.source",
                "the Flutter plugin needs the Flutter project source directory",
            ));
        }

        let jvm = jvm_targets(spec, &mut warnings);
        let multi_dex_enabled = defaults.multi_dex_enabled.unwrap_or(false);
        if multi_dex_enabled
            && min_sdk.is_some_and(|min| min >= NATIVE_MULTIDEX_MIN_SDK)
            && dependencies
                .iter()
                .any(|d| d.coordinate.to_string() == MULTIDEX_COORDINATE)
        {
            warnings.push(Warning {
                path: "dependencies".to_string(),
                message: format!(
                    "{} is unnecessary with minSdk {} or higher",
                    MULTIDEX_COORDINATE, NATIVE_MULTIDEX_MIN_SDK
                ),
            });
        }

        let (
            Some(application_id),
            Some(min_sdk),
            Some(target_sdk),
            Some(compile_sdk),
            Some(version_code),
            Some(version_name),
        ) = (
            application_id,
            min_sdk,
            target_sdk,
            compile_sdk,
            version_code,
            version_name,
        )
        else {
            return Err(ConfigError { violations });
        };

        if !violations.is_empty() {
            return Err(ConfigError { violations });
        }

        for warning in &warnings {
            warn!(path = %warning.path, "{}", warning.message);
        }

        Ok(BuildPlan {
            namespace: namespace.unwrap_or_else(|| application_id.clone()),
            build_config: BuildConfig {
                application_id,
                min_sdk,
                target_sdk,
                compile_sdk,
                version_code,
                version_name,
                multi_dex_enabled,
            },
            ndk_version,
            jvm,
            plugins: spec.plugins.iter().map(|p| p.id.clone()).collect(),
            flutter_source,
            variants: bindings.variants,
            signing_configs: bindings.signing_configs,
            dependencies,
            warnings,
        })
    }

    /// Resolve an integer field, falling back to the named framework property
    fn int_field(
        &self,
        path: &str,
        value: Option<&IntValue>,
        default_property: &str,
        violations: &mut Vec<Violation>,
    ) -> Option<u32> {
        let literal = match value {
            None => {
                return match self.registry.property(default_property) {
                    Some(FrameworkValue::Int(n)) => Some(n),
                    _ => {
                        violations.push(Violation::new(
                            ViolationKind::MissingField,
                            path,
                            format!("not set and no framework default '{}' is available", default_property),
                        ));
                        None
                    }
                };
            }
            Some(IntValue::Literal(n)) => *n,
            Some(IntValue::Reference(raw)) => {
                if let Some(property) = raw.strip_prefix(FRAMEWORK_REF_PREFIX) {
                    return match self.registry.property(property) {
                        Some(FrameworkValue::Int(n)) => Some(n),
                        Some(FrameworkValue::Text(_)) => {
                            violations.push(Violation::new(
                                ViolationKind::InvalidValue,
                                path,
                                format!("'{}' is not an integer property", raw),
                            ));
                            None
                        }
                        None => {
                            violations.push(Violation::new(
                                ViolationKind::MissingField,
                                path,
                                format!("framework property '{}' is not available", raw),
                            ));
                            None
                        }
                    };
                }
                match raw.trim().parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => {
                        violations.push(Violation::new(
                            ViolationKind::InvalidValue,
                            path,
                            format!("'{}' is neither an integer nor a framework property", raw),
                        ));
                        return None;
                    }
                }
            }
        };

        let field = path.rsplit('.').next().unwrap_or(path);
        let prefix = path.strip_suffix(field).map(|p| p.trim_end_matches('.')).unwrap_or("");
        let result = Validator::new()
            .non_negative(field, literal)
            .range(field, literal, 0, i64::from(u32::MAX))
            .validate();
        if !result.is_valid() {
            // A negative value fails both checks; report it once.
            if let Some(first) = result.into_errors().into_iter().next() {
                violations.push(Violation::from_validation(prefix, first));
            }
            return None;
        }
        u32::try_from(literal).ok()
    }

    /// Resolve a text field that may reference a framework property
    fn text_field(
        &self,
        path: &str,
        value: Option<&str>,
        default_property: &str,
        violations: &mut Vec<Violation>,
    ) -> Option<String> {
        let Some(raw) = value else {
            let text = self.framework_text(default_property);
            if text.is_none() {
                violations.push(Violation::new(
                    ViolationKind::MissingField,
                    path,
                    format!("not set and no framework default '{}' is available", default_property),
                ));
            }
            return text;
        };

        let Some(property) = raw.strip_prefix(FRAMEWORK_REF_PREFIX) else {
            return Some(raw.to_string());
        };
        match self.registry.property(property) {
            Some(FrameworkValue::Text(text)) => Some(text),
            Some(FrameworkValue::Int(n)) => Some(n.to_string()),
            None => {
                violations.push(Violation::new(
                    ViolationKind::MissingField,
                    path,
                    format!("framework property '{}' is not available", raw),
                ));
                None
            }
        }
    }

    fn framework_text(&self, property: &str) -> Option<String> {
        match self.registry.property(property) {
            Some(FrameworkValue::Text(text)) => Some(text),
            Some(FrameworkValue::Int(n)) => Some(n.to_string()),
            None => None,
        }
    }
}

fn jvm_targets(spec: &ModuleSpec, warnings: &mut Vec<Warning>) -> JvmTargets {
    let options = &spec.android.compile_options;
    let source = options
        .source_compatibility
        .as_deref()
        .map_or_else(|| DEFAULT_JAVA_VERSION.to_string(), normalize_java_version);
    let target = options
        .target_compatibility
        .as_deref()
        .map_or_else(|| source.clone(), normalize_java_version);
    let jvm_target = spec
        .android
        .kotlin_options
        .jvm_target
        .as_deref()
        .map_or_else(|| target.clone(), normalize_java_version);

    if jvm_target != target {
        warnings.push(Warning {
            path: "android.kotlinOptions.jvmTarget".to_string(),
            message: format!(
                "Kotlin jvmTarget {} differs from Java targetCompatibility {}",
                jvm_target, target
            ),
        });
    }

    JvmTargets {
        source_compatibility: source,
        target_compatibility: target,
        jvm_target,
    }
}

/// Resolve with the given registry
pub fn resolve(spec: &ModuleSpec, registry: &ToolchainRegistry) -> Result<BuildPlan, ConfigError> {
    Resolver::new(registry).resolve(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BuildTypeSpec, DependencySpec, FlutterBlock, PluginRef,
    };
    use crate::plugins::{ANDROID_APPLICATION, FRAMEWORK, GOOGLE_SERVICES, KOTLIN_ANDROID};
    use proptest::prelude::*;

    fn flutter_module() -> ModuleSpec {
        let mut spec = ModuleSpec {
            plugins: [ANDROID_APPLICATION, KOTLIN_ANDROID, FRAMEWORK, GOOGLE_SERVICES]
                .into_iter()
                .map(PluginRef::new)
                .collect(),
            flutter: Some(FlutterBlock {
                source: Some("../..".to_string()),
            }),
            dependencies: vec![
                DependencySpec::implementation("androidx.multidex:multidex:2.0.1"),
                DependencySpec::platform("com.google.firebase:firebase-bom:34.8.0"),
                DependencySpec::implementation("com.google.firebase:firebase-analytics"),
                DependencySpec::implementation("com.google.firebase:firebase-auth"),
                DependencySpec::implementation("com.google.firebase:firebase-firestore"),
            ],
            ..Default::default()
        };
        spec.android.namespace = Some("com.idisr.cityvape".to_string());
        spec.android.compile_sdk = Some(IntValue::Literal(36));
        spec.android.ndk_version = Some("flutter.ndkVersion".to_string());
        spec.android.compile_options.source_compatibility = Some("VERSION_17".to_string());
        spec.android.compile_options.target_compatibility = Some("VERSION_17".to_string());
        spec.android.kotlin_options.jvm_target = Some("17".to_string());
        let dc = &mut spec.android.default_config;
        dc.application_id = Some("com.idisr.cityvape".to_string());
        dc.min_sdk = Some(IntValue::Reference("flutter.minSdkVersion".to_string()));
        dc.target_sdk = Some(IntValue::Literal(36));
        dc.version_code = Some(IntValue::Reference("flutter.versionCode".to_string()));
        dc.version_name = Some("flutter.versionName".to_string());
        dc.multi_dex_enabled = Some(true);
        spec.android.build_types.insert(
            "release".to_string(),
            BuildTypeSpec {
                signing_config: Some("debug".to_string()),
                minify_enabled: Some(false),
                shrink_resources: Some(false),
                ..Default::default()
            },
        );
        spec
    }

    #[test]
    fn test_flutter_module_resolves() {
        let registry = ToolchainRegistry::builtin();
        let plan = resolve(&flutter_module(), &registry).unwrap();

        let config = &plan.build_config;
        assert_eq!(config.application_id, "com.idisr.cityvape");
        assert_eq!((config.min_sdk, config.target_sdk, config.compile_sdk), (21, 36, 36));
        assert_eq!(config.version_code, 1);
        assert_eq!(config.version_name, "1.0");
        assert!(config.multi_dex_enabled);
        assert_eq!(plan.ndk_version.as_deref(), Some("27.0.12077973"));
        assert_eq!(plan.jvm.jvm_target, "17");
        assert_eq!(plan.variants["release"].signing_config, "debug");
        assert_eq!(plan.dependencies.len(), 5);
        assert_eq!(plan.dependencies[1].version.as_deref(), Some("34.8.0"));
        assert_eq!(plan.dependencies[3].version, None);
        assert_eq!(plan.flutter_source.as_deref(), Some("../.."));
        // release signed with debug key, and multidex with minSdk 21
        assert_eq!(plan.warnings.len(), 2);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let registry = ToolchainRegistry::builtin();
        let spec = flutter_module();
        assert_eq!(resolve(&spec, &registry), resolve(&spec, &registry));
    }

    #[test]
    fn test_missing_release_signing_config() {
        let mut spec = flutter_module();
        spec.android
            .build_types
            .get_mut("release")
            .unwrap()
            .signing_config = Some("release".to_string());

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert!(err.has(ViolationKind::UnresolvedSigningReference));
        assert_eq!(err.violations.len(), 1);
    }

    #[test]
    fn test_conflicting_explicit_versions() {
        let mut spec = flutter_module();
        spec.dependencies
            .push(DependencySpec::implementation("com.example:lib:1.0"));
        spec.dependencies
            .push(DependencySpec::implementation("com.example:lib:2.0"));

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.of_kind(ViolationKind::VersionConflict).count(), 1);
    }

    #[test]
    fn test_every_violation_reported_together() {
        let mut spec = flutter_module();
        spec.plugins.swap(0, 2);
        spec.android.default_config.min_sdk = Some(IntValue::Literal(40));
        spec.android
            .build_types
            .get_mut("release")
            .unwrap()
            .signing_config = Some("release".to_string());
        spec.dependencies
            .push(DependencySpec::implementation("com.example:lib:1.0"));
        spec.dependencies
            .push(DependencySpec::implementation("com.example:lib:2.0"));

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        for kind in [
            ViolationKind::OrderingViolation,
            ViolationKind::SdkOrdering,
            ViolationKind::UnresolvedSigningReference,
            ViolationKind::VersionConflict,
        ] {
            assert!(err.has(kind), "missing {:?} in {}", kind, err);
        }
    }

    #[test]
    fn test_missing_defaults_without_registry() {
        let mut spec = flutter_module();
        spec.android.ndk_version = None;
        spec.android.default_config.min_sdk = None;
        spec.android.default_config.version_name = None;

        let err = resolve(&spec, &ToolchainRegistry::empty()).unwrap_err();
        let missing: Vec<_> = err
            .of_kind(ViolationKind::MissingField)
            .map(|v| v.path.as_str())
            .collect();
        assert_eq!(
            missing,
            vec![
                "android.defaultConfig.minSdk",
                "android.defaultConfig.versionCode",
                "android.defaultConfig.versionName",
            ]
        );
    }

    #[test]
    fn test_negative_sdk_rejected() {
        let mut spec = flutter_module();
        spec.android.compile_sdk = Some(IntValue::Literal(-1));

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].kind, ViolationKind::InvalidValue);
        assert_eq!(err.violations[0].path, "android.compileSdk");
    }

    #[test]
    fn test_bad_application_id() {
        let mut spec = flutter_module();
        spec.android.default_config.application_id = Some("cityvape".to_string());

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations[0].path, "android.defaultConfig.applicationId");
        assert_eq!(err.violations[0].kind, ViolationKind::InvalidValue);
    }

    #[test]
    fn test_application_id_falls_back_to_namespace() {
        let mut spec = flutter_module();
        spec.android.default_config.application_id = None;
        let plan = resolve(&spec, &ToolchainRegistry::builtin()).unwrap();
        assert_eq!(plan.build_config.application_id, "com.idisr.cityvape");
    }

    #[test]
    fn test_bad_namespace_reported_once_when_used_as_application_id() {
        let mut spec = flutter_module();
        spec.android.namespace = Some("cityvape".to_string());
        spec.android.default_config.application_id = None;

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations.len(), 1, "{}", err);
        assert_eq!(err.violations[0].path, "android.namespace");
        assert_eq!(err.violations[0].kind, ViolationKind::InvalidValue);
    }

    #[test]
    fn test_version_code_above_store_limit() {
        let mut spec = flutter_module();
        spec.android.default_config.version_code =
            Some(IntValue::Literal(i64::from(MAX_VERSION_CODE) + 1));

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations.len(), 1, "{}", err);
        assert_eq!(err.violations[0].kind, ViolationKind::InvalidValue);
        assert_eq!(err.violations[0].path, "android.defaultConfig.versionCode");

        spec.android.default_config.version_code = Some(IntValue::Literal(i64::from(MAX_VERSION_CODE)));
        assert!(resolve(&spec, &ToolchainRegistry::builtin()).is_ok());
    }

    #[test]
    fn test_blank_version_name() {
        let mut spec = flutter_module();
        spec.android.default_config.version_name = Some("   ".to_string());

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations.len(), 1, "{}", err);
        assert_eq!(err.violations[0].kind, ViolationKind::MissingField);
        assert_eq!(err.violations[0].path, "android.defaultConfig.versionName");
    }

    #[test]
    fn test_kotlin_jvm_target_mismatch_warns() {
        let mut spec = flutter_module();
        spec.android.kotlin_options.jvm_target = Some("JVM_11".to_string());

        let plan = resolve(&spec, &ToolchainRegistry::builtin()).unwrap();
        assert_eq!(plan.jvm.jvm_target, "11");
        assert_eq!(plan.jvm.target_compatibility, "17");
        let warning = plan
            .warnings
            .iter()
            .find(|w| w.path == "android.kotlinOptions.jvmTarget")
            .expect("jvmTarget warning");
        assert!(warning.message.contains("11"));
        assert!(warning.message.contains("17"));
        assert_eq!(plan.warnings.len(), 3);
    }

    #[test]
    fn test_unknown_framework_property() {
        let mut spec = flutter_module();
        spec.android.default_config.target_sdk =
            Some(IntValue::Reference("flutter.maxSdkVersion".to_string()));

        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations[0].kind, ViolationKind::MissingField);
    }

    #[test]
    fn test_framework_plugin_needs_source() {
        let mut spec = flutter_module();
        spec.flutter = None;
        let err = resolve(&spec, &ToolchainRegistry::builtin()).unwrap_err();
        assert_eq!(err.violations[0].path, "flutter.source");
    }

    proptest! {
        #[test]
        fn prop_resolved_sdks_are_ordered(min in 0i64..50, target in 0i64..50, compile in 0i64..50) {
            let mut spec = flutter_module();
            spec.android.default_config.min_sdk = Some(IntValue::Literal(min));
            spec.android.default_config.target_sdk = Some(IntValue::Literal(target));
            spec.android.compile_sdk = Some(IntValue::Literal(compile));

            match resolve(&spec, &ToolchainRegistry::builtin()) {
                Ok(plan) => {
                    let c = plan.build_config;
                    prop_assert!(c.min_sdk <= c.target_sdk && c.target_sdk <= c.compile_sdk);
                }
                Err(err) => {
                    prop_assert!(min > target || target > compile);
                    prop_assert!(err.violations.iter().all(|v| v.kind == ViolationKind::SdkOrdering));
                }
            }
        }

        #[test]
        fn prop_resolution_is_deterministic(code in 0i64..1_000_000, name in "[0-9]{1,2}\\.[0-9]{1,2}") {
            let mut spec = flutter_module();
            spec.android.default_config.version_code = Some(IntValue::Literal(code));
            spec.android.default_config.version_name = Some(name);
            let registry = ToolchainRegistry::builtin();
            prop_assert_eq!(resolve(&spec, &registry), resolve(&spec, &registry));
        }
    }
}
