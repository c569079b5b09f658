//! Plugin application order
//!
//! The framework's Gradle plugin configures the Android and Kotlin extensions,
//! so both must already be applied when it runs.

use crate::error::{Violation, ViolationKind};
use crate::model::PluginRef;
use std::collections::HashMap;

/// Android application plugin
pub const ANDROID_APPLICATION: &str = "com.android.application";
/// Kotlin Android plugin, short form
pub const KOTLIN_ANDROID: &str = "kotlin-android";
/// Kotlin Android plugin, fully qualified form
pub const KOTLIN_ANDROID_QUALIFIED: &str = "org.jetbrains.kotlin.android";
/// Flutter Gradle plugin
pub const FRAMEWORK: &str = "dev.flutter.flutter-gradle-plugin";
/// Google services plugin (Firebase configuration)
pub const GOOGLE_SERVICES: &str = "com.google.gms.google-services";

/// Canonical id for a plugin (`kotlin-android` and its qualified alias collapse)
pub fn canonical_id(id: &str) -> &str {
    match id {
        KOTLIN_ANDROID | KOTLIN_ANDROID_QUALIFIED => KOTLIN_ANDROID_QUALIFIED,
        other => other,
    }
}

/// Whether the framework plugin is applied
pub fn applies_framework(plugins: &[PluginRef]) -> bool {
    plugins.iter().any(|p| p.id == FRAMEWORK)
}

/// Check duplicates and ordering, returning every violation
pub fn check_order(plugins: &[PluginRef]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (index, plugin) in plugins.iter().enumerate() {
        let id = canonical_id(&plugin.id);
        if id.trim().is_empty() {
            violations.push(Violation::new(
                ViolationKind::InvalidValue,
                format!("plugins[{}]", index),
                "plugin id must not be empty",
            ));
            continue;
        }
        if positions.insert(id, index).is_some() {
            violations.push(Violation::new(
                ViolationKind::InvalidValue,
                format!("plugins[{}]", index),
                format!("plugin '{}' is applied more than once", plugin.id),
            ));
        }
    }

    let Some(&framework_at) = positions.get(FRAMEWORK) else {
        return violations;
    };

    match positions.get(ANDROID_APPLICATION) {
        None => violations.push(Violation::new(
            ViolationKind::OrderingViolation,
            format!("plugins[{}]", framework_at),
            format!(
                "'{}' requires '{}' to be applied first, but it is not applied",
                FRAMEWORK, ANDROID_APPLICATION
            ),
        )),
        Some(&android_at) if android_at > framework_at => {
            violations.push(Violation::new(
                ViolationKind::OrderingViolation,
                format!("plugins[{}]", android_at),
                format!(
                    "'{}' must be applied before '{}'",
                    ANDROID_APPLICATION, FRAMEWORK
                ),
            ));
        }
        Some(_) => {}
    }

    if let Some(&kotlin_at) = positions.get(KOTLIN_ANDROID_QUALIFIED) {
        if kotlin_at > framework_at {
            violations.push(Violation::new(
                ViolationKind::OrderingViolation,
                format!("plugins[{}]", kotlin_at),
                format!("'{}' must be applied before '{}'", plugins[kotlin_at].id, FRAMEWORK),
            ));
        }
    }

    violations
}
