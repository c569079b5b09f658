//! Dependency coordinates and BoM version pinning

use crate::error::{Violation, ViolationKind};
use crate::model::DependencySpec;
use crate::registry::ToolchainRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static COORDINATE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").expect("valid coordinate regex"));

/// `group:artifact`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// A parsed dependency notation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notation {
    pub coordinate: Coordinate,
    pub version: Option<String>,
}

impl Notation {
    /// Parse `group:artifact[:version[:classifier]][@ext]`
    pub fn parse(raw: &str) -> Result<Self, String> {
        let without_ext = raw.split('@').next().unwrap_or(raw).trim();
        let parts: Vec<&str> = without_ext.split(':').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(format!(
                "'{}' is not a 'group:artifact[:version]' notation",
                raw
            ));
        }

        let (group, artifact) = (parts[0], parts[1]);
        for (label, part) in [("group", group), ("artifact", artifact)] {
            if !COORDINATE_PART.is_match(part) {
                return Err(format!("'{}' has an invalid {} '{}'", raw, label, part));
            }
        }

        let version = match parts.get(2) {
            Some(v) if v.trim().is_empty() => {
                return Err(format!("'{}' has an empty version", raw));
            }
            Some(v) => Some(v.trim().to_string()),
            None => None,
        };

        Ok(Self {
            coordinate: Coordinate {
                group: group.to_string(),
                artifact: artifact.to_string(),
            },
            version,
        })
    }
}

/// Where a resolved version came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionSource {
    /// Declared on the dependency itself
    Explicit,
    /// Pinned by a platform BoM
    Bom { bom: String },
}

/// A dependency with its final version
///
/// `version` is `None` for a BoM-managed artifact the catalog has no pin for:
/// Gradle takes the version from the BoM's own metadata at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub configuration: String,
    pub coordinate: Coordinate,
    pub version: Option<String>,
    pub source: VersionSource,
    /// A BoM rather than a library
    pub platform: bool,
}

impl ResolvedDependency {
    /// `group:artifact:version`, or `group:artifact` when the BoM supplies it
    pub fn notation(&self) -> String {
        match &self.version {
            Some(version) => format!("{}:{}", self.coordinate, version),
            None => self.coordinate.to_string(),
        }
    }
}

struct Bom {
    coordinate: Coordinate,
    version: String,
}

/// Resolve every declaration to a pinned version, collecting violations
///
/// Explicit versions win over BoM pins. A BoM pins an unversioned artifact of
/// its own group to the catalog version when the registry knows it. Without a
/// catalog entry the artifact stays BoM-managed with no concrete version.
pub fn resolve(
    specs: &[DependencySpec],
    registry: &ToolchainRegistry,
    violations: &mut Vec<Violation>,
) -> Vec<ResolvedDependency> {
    let mut parsed = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        match Notation::parse(&spec.notation) {
            Ok(notation) => parsed.push((index, spec, notation)),
            Err(message) => violations.push(Violation::new(
                ViolationKind::InvalidValue,
                format!("dependencies[{}]", index),
                message,
            )),
        }
    }

    let mut explicit: BTreeMap<&Coordinate, &str> = BTreeMap::new();
    let mut boms: Vec<Bom> = Vec::new();
    for (index, spec, notation) in &parsed {
        let Some(version) = notation.version.as_deref() else {
            if spec.platform {
                violations.push(Violation::new(
                    ViolationKind::MissingField,
                    format!("dependencies[{}]", index),
                    format!("platform '{}' must declare a version", notation.coordinate),
                ));
            }
            continue;
        };

        match explicit.get(&notation.coordinate) {
            Some(&previous) if previous != version => violations.push(Violation::new(
                ViolationKind::VersionConflict,
                format!("dependencies[{}]", index),
                format!(
                    "'{}' is declared with versions '{}' and '{}'",
                    notation.coordinate, previous, version
                ),
            )),
            Some(_) => {}
            None => {
                explicit.insert(&notation.coordinate, version);
                if spec.platform {
                    boms.push(Bom {
                        coordinate: notation.coordinate.clone(),
                        version: version.to_string(),
                    });
                }
            }
        }
    }

    let mut resolved: Vec<ResolvedDependency> = Vec::new();
    for (index, spec, notation) in &parsed {
        if spec.platform && notation.version.is_none() {
            continue;
        }

        let pinned = match explicit.get(&notation.coordinate) {
            Some(&version) => Some((Some(version.to_string()), VersionSource::Explicit)),
            None => boms
                .iter()
                .find(|bom| bom.coordinate.group == notation.coordinate.group)
                .map(|bom| {
                    let bom_id = bom.coordinate.to_string();
                    let version = registry
                        .bom_pin(&bom_id, &bom.version, &notation.coordinate.artifact)
                        .map(str::to_string);
                    (version, VersionSource::Bom { bom: bom_id })
                }),
        };

        let Some((version, source)) = pinned else {
            violations.push(Violation::new(
                ViolationKind::MissingField,
                format!("dependencies[{}]", index),
                format!(
                    "'{}' has no version and no platform BoM for group '{}'",
                    notation.coordinate, notation.coordinate.group
                ),
            ));
            continue;
        };

        let duplicate = resolved.iter().any(|r| {
            r.configuration == spec.configuration && r.coordinate == notation.coordinate
        });
        if !duplicate {
            resolved.push(ResolvedDependency {
                configuration: spec.configuration.clone(),
                coordinate: notation.coordinate.clone(),
                version,
                source,
                platform: spec.platform,
            });
        }
    }

    resolved
}
