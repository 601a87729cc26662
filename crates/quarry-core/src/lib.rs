//! Quarry Core Library
//!
//! Domain logic for browsing the Modrinth plugin catalog, filtering
//! versions by server loader, resolving required-dependency closures, and
//! downloading plugin files into a server's plugins directory.
//!
//! The core is synchronous request/response logic over async I/O seams;
//! front-ends (CLI/TUI) own scheduling, prompts and rendering.

pub mod catalog;
pub mod compat;
pub mod config;
pub mod download;
pub mod resolve;

/// Re-exports of commonly used types
pub mod prelude {
    // Catalog
    pub use crate::catalog::{
        CatalogClient, CatalogError, DependencyKind, DependencyRef, Loader, LoaderFilter,
        ModrinthClient, PluginDetails, PluginSummary, PluginVersion, VersionFile,
    };

    // Compatibility
    pub use crate::compat::filter_by_loader;

    // Resolution
    pub use crate::resolve::{
        ClosureEntry, DependencyResolver, OptionalDependency, ResolutionWarning, ResolveError,
        ResolvedClosure, UnresolvedReason,
    };

    // Downloads
    pub use crate::download::{
        CancelToken, DownloadOrchestrator, DownloadOutcome, DownloadStatus, FileFetcher,
        HttpFetcher,
    };

    // Configuration
    pub use crate::config::{QuarryConfig, resolve_plugins_dir};
}
