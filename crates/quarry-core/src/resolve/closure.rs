//! Resolution results: the download closure and its warnings.

use std::fmt;

use serde::Serialize;

use crate::catalog::{PluginVersion, VersionFile};

/// One file to download: a version paired with its installable artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ClosureEntry {
    pub version: PluginVersion,
    pub file: VersionFile,
}

/// An optional dependency surfaced for the user but never auto-resolved.
#[derive(Debug, Clone, Serialize)]
pub struct OptionalDependency {
    pub project_id: Option<String>,
    pub version_id: Option<String>,
    /// Project id of the version that declared it.
    pub requested_by: String,
}

impl OptionalDependency {
    pub fn label(&self) -> &str {
        self.project_id
            .as_deref()
            .or(self.version_id.as_deref())
            .unwrap_or("unknown")
    }
}

/// The transitive result of resolution.
///
/// Invariants: `entries` is never empty, the chosen root version is the
/// first entry, and no two entries share a `project_id`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedClosure {
    /// Files to download, root first.
    pub entries: Vec<ClosureEntry>,
    /// Optional dependencies, visible but unselected.
    pub optional: Vec<OptionalDependency>,
    /// Dependency-level problems downgraded from failures.
    pub warnings: Vec<ResolutionWarning>,
}

impl ResolvedClosure {
    /// The chosen root version's entry.
    pub fn root(&self) -> &ClosureEntry {
        &self.entries[0]
    }
}

/// Why a required dependency could not be added to the closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnresolvedReason {
    /// No version of the plugin declares a compatible loader.
    NoCompatibleVersion,
    /// The selected version has no downloadable file.
    NoPrimaryFile,
    /// The dependency record carries neither a project nor a version id.
    MissingReference,
    /// The dependency sits deeper than the resolution depth cap.
    DepthLimit,
    /// Fetching the dependency from the catalog failed.
    Fetch(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoCompatibleVersion => f.write_str("no compatible version"),
            UnresolvedReason::NoPrimaryFile => f.write_str("no downloadable file"),
            UnresolvedReason::MissingReference => f.write_str("dependency has no usable reference"),
            UnresolvedReason::DepthLimit => f.write_str("dependency chain too deep"),
            UnresolvedReason::Fetch(message) => write!(f, "fetch failed: {message}"),
        }
    }
}

/// A dependency-level problem that does not fail the whole resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolutionWarning {
    /// A required dependency could not be resolved.
    Unresolved {
        plugin: String,
        requested_by: String,
        reason: UnresolvedReason,
    },
    /// A required dependency closes a cycle back onto its own ancestors.
    Cycle { plugin: String, requested_by: String },
    /// A declared incompatibility; the plugin is never fetched.
    Incompatible { plugin: String, requested_by: String },
    /// Resolution stopped at the closure size cap.
    Truncated { limit: usize },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::Unresolved {
                plugin,
                requested_by,
                reason,
            } => write!(f, "dependency '{plugin}' of '{requested_by}' unresolved: {reason}"),
            ResolutionWarning::Cycle {
                plugin,
                requested_by,
            } => write!(f, "dependency cycle: '{plugin}' required again by '{requested_by}'"),
            ResolutionWarning::Incompatible {
                plugin,
                requested_by,
            } => write!(f, "'{requested_by}' declares '{plugin}' incompatible"),
            ResolutionWarning::Truncated { limit } => {
                write!(f, "resolution stopped at the closure limit of {limit} entries")
            }
        }
    }
}
