//! Field validation that accumulates every failure
//!
//! The validator never stops at the first failure: each check appends to the
//! result so a caller can report all problems in one pass.
//!
//! # Example
//!
//! ```rust
//! use buildplan_core::validation::Validator;
//!
//! let result = Validator::new()
//!     .required("versionName", "1.0.0")
//!     .range("versionCode", 0_i64, 1, 2_100_000_000)
//!     .validate();
//!
//! assert!(!result.is_valid());
//! assert_eq!(result.errors()[0].field, "versionCode");
//! ```

use crate::error::{Error, ErrorCode, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
    /// Expected value (if applicable)
    pub expected: Option<String>,
    /// Actual value (if applicable)
    pub actual: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Take ownership of the errors
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Convert to Result type
    pub fn to_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            Err(Error::new(
                ErrorCode::ValidationError,
                format!("Validation failed: {}", messages.join("; ")),
            ))
        }
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    /// Validate that a field is not empty
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: "Field is required".to_string(),
                code: "REQUIRED".to_string(),
                expected: Some("non-empty value".to_string()),
                actual: Some("empty".to_string()),
            });
        }
        self
    }

    /// Validate against a compiled pattern
    pub fn pattern(mut self, field: &str, value: &str, re: &Regex, description: &str) -> Self {
        if !re.is_match(value) {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: format!("Must be {}", description),
                code: "PATTERN".to_string(),
                expected: Some(description.to_string()),
                actual: Some(value.to_string()),
            });
        }
        self
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of(mut self, field: &str, value: &str, allowed: &[&str]) -> Self {
        if !allowed.contains(&value) {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: format!("Must be one of: {}", allowed.join(", ")),
                code: "ONE_OF".to_string(),
                expected: Some(allowed.join(", ")),
                actual: Some(value.to_string()),
            });
        }
        self
    }

    /// Validate a numeric range (inclusive)
    pub fn range<T: PartialOrd + std::fmt::Display>(
        mut self,
        field: &str,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        if value < min || value > max {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: format!("Must be between {} and {}", min, max),
                code: "RANGE".to_string(),
                expected: Some(format!("{} - {}", min, max)),
                actual: Some(value.to_string()),
            });
        }
        self
    }

    /// Validate that an integer is not negative
    pub fn non_negative(mut self, field: &str, value: i64) -> Self {
        if value < 0 {
            self.result.add_error(ValidationError {
                field: field.to_string(),
                message: "Must be a non-negative integer".to_string(),
                code: "NON_NEGATIVE".to_string(),
                expected: Some(">= 0".to_string()),
                actual: Some(value.to_string()),
            });
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}
