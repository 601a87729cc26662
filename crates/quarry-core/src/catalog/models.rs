//! Wire models for the Modrinth v2 catalog.
//!
//! All records are read-only value objects produced by catalog responses.
//! Required fields have no serde defaults: a response missing one fails
//! deserialization and surfaces as [`CatalogError::Malformed`].
//!
//! [`CatalogError::Malformed`]: super::CatalogError::Malformed

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A server-software flavor a plugin version can target.
///
/// The catalog's loader vocabulary grows over time, so unrecognized values
/// are preserved as [`Loader::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Loader {
    Paper,
    Spigot,
    Bukkit,
    Purpur,
    Folia,
    Fabric,
    Velocity,
    Other(String),
}

impl Loader {
    fn from_name(name: &str) -> Loader {
        match name.to_ascii_lowercase().as_str() {
            "paper" => Loader::Paper,
            "spigot" => Loader::Spigot,
            "bukkit" => Loader::Bukkit,
            "purpur" => Loader::Purpur,
            "folia" => Loader::Folia,
            "fabric" => Loader::Fabric,
            "velocity" => Loader::Velocity,
            other => Loader::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Loader::Paper => "paper",
            Loader::Spigot => "spigot",
            Loader::Bukkit => "bukkit",
            Loader::Purpur => "purpur",
            Loader::Folia => "folia",
            Loader::Fabric => "fabric",
            Loader::Velocity => "velocity",
            Loader::Other(name) => name,
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Loader {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Loader::from_name(s))
    }
}

impl Serialize for Loader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Loader {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Loader::from_name(&raw))
    }
}

/// Loader filter applied to search facets and version compatibility.
///
/// The UI filters by a checked *set* of loaders with OR semantics; a
/// single-loader filter is just `AnyOf` with one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoaderFilter {
    /// No filtering; every version passes.
    #[default]
    Any,
    /// A version passes if it declares at least one of these loaders.
    AnyOf(Vec<Loader>),
}

impl LoaderFilter {
    /// Build a filter from a loader set; an empty set means no filter.
    pub fn any_of(loaders: impl IntoIterator<Item = Loader>) -> Self {
        let loaders: Vec<Loader> = loaders.into_iter().collect();
        if loaders.is_empty() {
            LoaderFilter::Any
        } else {
            LoaderFilter::AnyOf(loaders)
        }
    }

    /// Whether a version declaring `declared` passes this filter.
    pub fn matches(&self, declared: &[Loader]) -> bool {
        match self {
            LoaderFilter::Any => true,
            LoaderFilter::AnyOf(allowed) => declared.iter().any(|l| allowed.contains(l)),
        }
    }

    /// The loaders to facet searches by; empty when unfiltered.
    pub fn loaders(&self) -> &[Loader] {
        match self {
            LoaderFilter::Any => &[],
            LoaderFilter::AnyOf(loaders) => loaders,
        }
    }
}

/// A search hit identifying a plugin for further queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSummary {
    pub project_id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub downloads: u64,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// The full project record behind a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDetails {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Full markdown body; preferred over the short description when present.
    #[serde(default)]
    pub body: Option<String>,
    pub downloads: u64,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl PluginDetails {
    /// The text shown in a detail view: body if present, else description.
    pub fn display_text(&self) -> &str {
        self.body.as_deref().unwrap_or(&self.description)
    }
}

/// One published version of a plugin. Identity is the version `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginVersion {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub version_number: String,
    pub loaders: Vec<Loader>,
    pub dependencies: Vec<DependencyRef>,
    pub files: Vec<VersionFile>,
    pub date_published: DateTime<Utc>,
}

impl PluginVersion {
    /// The installable artifact of this version.
    ///
    /// The catalog flags one file per version as primary; some older
    /// versions flag none, in which case the first file is the artifact.
    /// `None` means the version has no files at all and is not installable.
    pub fn primary_file(&self) -> Option<&VersionFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }
}

/// A downloadable file attached to a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionFile {
    pub url: String,
    pub filename: String,
    pub primary: bool,
    pub size: u64,
}

/// A dependency declared by a version.
///
/// The catalog may omit either id, but a well-formed record carries at
/// least one of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRef {
    pub project_id: Option<String>,
    pub version_id: Option<String>,
    #[serde(rename = "dependency_type")]
    pub kind: DependencyKind,
}

/// Relation kind of a dependency. Unknown kinds fail deserialization;
/// guessing a kind would silently change resolution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Required,
    Optional,
    Incompatible,
    Embedded,
}
