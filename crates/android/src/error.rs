//! Resolution and front-end errors

use buildplan_core::error::{Error, ErrorCode};
use buildplan_core::validation::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a configuration violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// A required value is absent and no default exists
    MissingField,
    /// Plugins applied in an order the framework cannot work with
    OrderingViolation,
    /// Two explicit versions declared for the same coordinate
    VersionConflict,
    /// A build type names a signing config that does not exist
    UnresolvedSigningReference,
    /// A value is present but malformed or out of range
    InvalidValue,
    /// `minSdk <= targetSdk <= compileSdk` does not hold
    SdkOrdering,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingField => "missing field",
            Self::OrderingViolation => "plugin ordering",
            Self::VersionConflict => "version conflict",
            Self::UnresolvedSigningReference => "unresolved signing config",
            Self::InvalidValue => "invalid value",
            Self::SdkOrdering => "sdk ordering",
        };
        f.write_str(name)
    }
}

/// One configuration problem, located by its DSL path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Location such as `android.defaultConfig.minSdk`
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Convert a field validation failure found under `prefix`
    pub fn from_validation(prefix: &str, error: ValidationError) -> Self {
        let kind = match error.code.as_str() {
            "REQUIRED" => ViolationKind::MissingField,
            _ => ViolationKind::InvalidValue,
        };
        let path = if prefix.is_empty() {
            error.field
        } else {
            format!("{}.{}", prefix, error.field)
        };
        Self::new(kind, path, error.message)
    }

    /// Convert every error of a validation result found under `prefix`
    pub fn collect(prefix: &str, result: ValidationResult) -> Vec<Self> {
        result
            .into_errors()
            .into_iter()
            .map(|e| Self::from_validation(prefix, e))
            .collect()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}

/// Every violation found while resolving a module
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{} configuration violation(s):{}", .violations.len(), list(.violations))]
pub struct ConfigError {
    pub violations: Vec<Violation>,
}

fn list(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("\n  - {}", v))
        .collect()
}

impl ConfigError {
    /// Whether any violation has the given kind
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Violations of the given kind
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        let count = err.violations.len();
        Error::new(ErrorCode::ConfigValidationError, err.to_string())
            .with_context(format!("{} violation(s) must be fixed before building", count))
    }
}

/// Failure to read a Gradle Kotlin DSL build script
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    #[error("line {line}: syntax error: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unsupported construct: {message}")]
    Unsupported { line: usize, message: String },
}

impl From<DslError> for Error {
    fn from(err: DslError) -> Self {
        Error::new(ErrorCode::ConfigParseError, err.to_string())
            .with_suggestion("Only the declarative subset of build.gradle.kts is understood; describe the module in TOML instead")
    }
}
