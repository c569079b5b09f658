//! The resolved build plan handed to the build executor

use crate::dependency::{ResolvedDependency, VersionSource};
use crate::signing::{SigningConfig, Variant};
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Resolved application identity and SDK levels
///
/// Invariant: `min_sdk <= target_sdk <= compile_sdk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub application_id: String,
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub compile_sdk: u32,
    pub version_code: u32,
    pub version_name: String,
    pub multi_dex_enabled: bool,
}

/// Java and Kotlin bytecode targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JvmTargets {
    pub source_compatibility: String,
    pub target_compatibility: String,
    pub jvm_target: String,
}

/// A non-fatal finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Everything the build executor needs, fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPlan {
    pub namespace: String,
    pub build_config: BuildConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,
    pub jvm: JvmTargets,
    /// Plugin ids in application order
    pub plugins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flutter_source: Option<String>,
    pub variants: BTreeMap<String, Variant>,
    /// Signing configs bound by at least one variant
    pub signing_configs: BTreeMap<String, SigningConfig>,
    pub dependencies: Vec<ResolvedDependency>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Edge label in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Module declares the dependency under this configuration
    Declares,
    /// BoM supplies the dependency's version
    Pins,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declares => f.write_str("declares"),
            Self::Pins => f.write_str("pins"),
        }
    }
}

impl BuildPlan {
    /// Build the module → dependency and BoM → pinned-artifact graph
    ///
    /// Node 0 is the module itself, labelled with its application id.
    pub fn dependency_graph(&self) -> DiGraph<String, EdgeKind> {
        let mut graph = DiGraph::new();
        let root = graph.add_node(self.build_config.application_id.clone());
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

        for dep in &self.dependencies {
            let node = *nodes
                .entry(dep.coordinate.to_string())
                .or_insert_with(|| graph.add_node(dep.notation()));
            graph.update_edge(root, node, EdgeKind::Declares);
        }

        for dep in &self.dependencies {
            if let VersionSource::Bom { bom } = &dep.source {
                if let (Some(&from), Some(&to)) =
                    (nodes.get(bom), nodes.get(&dep.coordinate.to_string()))
                {
                    graph.update_edge(from, to, EdgeKind::Pins);
                }
            }
        }

        graph
    }

    /// Render the dependency graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let graph = self.dependency_graph();
        format!("{}", Dot::with_config(&graph, &[DotConfig::EdgeNoLabel]))
    }
}
