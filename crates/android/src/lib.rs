//! Build configuration resolution for Flutter Android application modules
//!
//! Takes a module description (a `build.gradle.kts` script or its TOML/JSON
//! equivalent) and produces a fully resolved [`BuildPlan`]:
//!
//! - framework references such as `flutter.minSdkVersion` replaced by values
//!   from the [`ToolchainRegistry`]
//! - plugin application order checked
//! - BoM-managed dependency versions pinned
//! - build types bound to signing configs
//!
//! Every problem found is reported at once in a [`ConfigError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use buildplan_android::{load_module, resolve, ToolchainRegistry};
//! use std::path::Path;
//!
//! let spec = load_module(Path::new("android/app/build.gradle.kts")).unwrap();
//! let plan = resolve(&spec, &ToolchainRegistry::builtin()).unwrap();
//! println!("{} targets SDK {}", plan.namespace, plan.build_config.target_sdk);
//! ```

pub mod dependency;
pub mod dsl;
pub mod error;
pub mod model;
pub mod plan;
pub mod plugins;
pub mod registry;
pub mod resolver;
pub mod signing;

pub use error::{ConfigError, DslError, Violation, ViolationKind};
pub use model::ModuleSpec;
pub use plan::{BuildConfig, BuildPlan};
pub use registry::{FrameworkDefaults, ToolchainRegistry};
pub use resolver::{resolve, Resolver};

use buildplan_core::config::load_file;
use buildplan_core::error::{Error, Result};
use std::path::Path;

/// Load a module description, picking the front end from the file extension
///
/// `.kts` files go through the Gradle Kotlin DSL parser; `.toml` and `.json`
/// are deserialized directly.
pub fn load_module(path: &Path) -> Result<ModuleSpec> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("kts") => {
            let source = std::fs::read_to_string(path)?;
            dsl::parse(&source).map_err(|e| {
                Error::from(e).with_context(format!("Failed to read {}", path.display()))
            })
        }
        Some("toml" | "json") => load_file(path),
        _ => Err(Error::config_parse(format!(
            "Unrecognized module file type: {}",
            path.display()
        ))
        .with_suggestion("Use build.gradle.kts, a .toml or a .json module description")),
    }
}
