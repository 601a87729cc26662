//! Typed access to the remote plugin catalog.
//!
//! Isolates all network and transport concerns from resolution logic.
//! The resolver and the front-ends depend on the [`CatalogClient`] trait;
//! [`ModrinthClient`] is the production implementation.

pub mod error;
pub mod models;
pub mod modrinth;

pub use error::CatalogError;
pub use models::{
    DependencyKind, DependencyRef, Loader, LoaderFilter, PluginDetails, PluginSummary,
    PluginVersion, VersionFile,
};
pub use modrinth::{DEFAULT_API_URL, ModrinthClient};

/// The four catalog operations the core depends on.
///
/// Search results are returned in the remote relevance order, never
/// re-sorted here. Each call has no side effects beyond network I/O.
#[allow(async_fn_in_trait)]
pub trait CatalogClient {
    /// Search for plugins matching `query`, faceted by the loader filter.
    async fn search(
        &self,
        query: &str,
        filter: &LoaderFilter,
    ) -> Result<Vec<PluginSummary>, CatalogError>;

    /// Fetch the full project record by id or slug.
    async fn get_plugin(&self, id_or_slug: &str) -> Result<PluginDetails, CatalogError>;

    /// List all published versions of a plugin.
    async fn get_versions(&self, plugin_id: &str) -> Result<Vec<PluginVersion>, CatalogError>;

    /// Fetch a single version by its id.
    async fn get_version(&self, version_id: &str) -> Result<PluginVersion, CatalogError>;
}
