//! Dependency closure resolution.
//!
//! Expands a chosen version's required dependencies into a download
//! closure. Implemented as an explicit worklist with a visited set and
//! depth/size caps, so the cycle guard and resource bounds are auditable;
//! dependency-level problems are downgraded to warnings, never failures of
//! the whole resolution. Only a root without a downloadable file is fatal.

mod closure;

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::catalog::{CatalogClient, DependencyKind, LoaderFilter, PluginVersion};
use crate::compat::filter_by_loader;

pub use closure::{
    ClosureEntry, OptionalDependency, ResolutionWarning, ResolvedClosure, UnresolvedReason,
};

/// How deep a required-dependency chain may go below the root.
pub const MAX_DEPTH: usize = 8;

/// Hard cap on closure entries, cycle guard of last resort.
pub const MAX_CLOSURE_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The chosen root version has nothing to download.
    #[error("version {version} of '{plugin}' has no downloadable file")]
    NoPrimaryFile { plugin: String, version: String },
}

/// A required dependency waiting to be resolved.
struct PendingDep {
    project_id: Option<String>,
    version_id: Option<String>,
    /// Project id of the version that declared the requirement.
    requested_by: String,
    /// Project ids from the root down to `requested_by`, for cycle checks.
    path: Vec<String>,
    depth: usize,
}

impl PendingDep {
    fn label(&self) -> String {
        self.project_id
            .clone()
            .or_else(|| self.version_id.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Resolves one plugin's dependency closure against a loader environment.
pub struct DependencyResolver<'a, C> {
    client: &'a C,
    max_depth: usize,
    max_entries: usize,
}

impl<'a, C: CatalogClient> DependencyResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            max_depth: MAX_DEPTH,
            max_entries: MAX_CLOSURE_SIZE,
        }
    }

    /// Override the depth and size caps.
    pub fn with_limits(client: &'a C, max_depth: usize, max_entries: usize) -> Self {
        Self {
            client,
            max_depth,
            max_entries,
        }
    }

    /// Expand `root` into its download closure under `filter`.
    ///
    /// The root entry always comes first; unresolved, incompatible and
    /// cyclic dependencies are reported as warnings on the closure, and the
    /// caller decides whether to proceed with a partial installation.
    pub async fn resolve(
        &self,
        root: PluginVersion,
        filter: &LoaderFilter,
    ) -> Result<ResolvedClosure, ResolveError> {
        let root_file = root
            .primary_file()
            .cloned()
            .ok_or_else(|| ResolveError::NoPrimaryFile {
                plugin: root.project_id.clone(),
                version: root.version_number.clone(),
            })?;

        let mut warnings = Vec::new();
        let mut optional = Vec::new();
        let mut queue = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::from([root.project_id.clone()]);

        let root_path = vec![root.project_id.clone()];
        enqueue_required(&root, &root_path, 1, &mut queue, &mut warnings, &mut optional);

        let mut entries = vec![ClosureEntry {
            version: root,
            file: root_file,
        }];

        while let Some(dep) = queue.pop_front() {
            if entries.len() >= self.max_entries {
                tracing::warn!(limit = self.max_entries, "dependency closure truncated");
                warnings.push(ResolutionWarning::Truncated {
                    limit: self.max_entries,
                });
                break;
            }

            // Dedup before fetching when the project id is already known.
            // First resolution wins; a hit on the requesting path is a cycle.
            if let Some(project_id) = &dep.project_id {
                if visited.contains(project_id) {
                    if dep.path.contains(project_id) {
                        warnings.push(cycle_warning(project_id, &dep.requested_by));
                    }
                    continue;
                }
            }

            if dep.depth > self.max_depth {
                warnings.push(unresolved_warning(&dep, UnresolvedReason::DepthLimit));
                continue;
            }

            let version = match self.fetch_dependency(&dep, filter).await {
                Ok(version) => version,
                Err(reason) => {
                    warnings.push(unresolved_warning(&dep, reason));
                    continue;
                }
            };

            // A pinned fetch can land on a project we already resolved.
            if visited.contains(&version.project_id) {
                if dep.path.contains(&version.project_id) {
                    warnings.push(cycle_warning(&version.project_id, &dep.requested_by));
                }
                continue;
            }

            let Some(file) = version.primary_file().cloned() else {
                warnings.push(ResolutionWarning::Unresolved {
                    plugin: version.project_id.clone(),
                    requested_by: dep.requested_by.clone(),
                    reason: UnresolvedReason::NoPrimaryFile,
                });
                continue;
            };

            tracing::debug!(
                plugin = %version.project_id,
                version = %version.version_number,
                requested_by = %dep.requested_by,
                "resolved required dependency"
            );

            visited.insert(version.project_id.clone());
            let mut path = dep.path.clone();
            path.push(version.project_id.clone());
            enqueue_required(
                &version,
                &path,
                dep.depth + 1,
                &mut queue,
                &mut warnings,
                &mut optional,
            );
            entries.push(ClosureEntry { version, file });
        }

        for warning in &warnings {
            tracing::warn!(%warning, "dependency resolution warning");
        }

        Ok(ResolvedClosure {
            entries,
            optional,
            warnings,
        })
    }

    /// Pick the version a pending requirement resolves to: a pinned id is
    /// fetched directly, otherwise the newest compatible version wins.
    async fn fetch_dependency(
        &self,
        dep: &PendingDep,
        filter: &LoaderFilter,
    ) -> Result<PluginVersion, UnresolvedReason> {
        match (&dep.version_id, &dep.project_id) {
            (Some(version_id), _) => self
                .client
                .get_version(version_id)
                .await
                .map_err(|err| UnresolvedReason::Fetch(err.to_string())),
            (None, Some(project_id)) => {
                let versions = self
                    .client
                    .get_versions(project_id)
                    .await
                    .map_err(|err| UnresolvedReason::Fetch(err.to_string()))?;
                filter_by_loader(versions, filter)
                    .into_iter()
                    .next()
                    .ok_or(UnresolvedReason::NoCompatibleVersion)
            }
            (None, None) => Err(UnresolvedReason::MissingReference),
        }
    }
}

/// Classify a version's declared dependencies: required ones enter the
/// worklist, optional ones are surfaced unselected, embedded ones are
/// already bundled in the primary file, incompatible ones become warnings
/// and are never fetched.
fn enqueue_required(
    version: &PluginVersion,
    path: &[String],
    depth: usize,
    queue: &mut VecDeque<PendingDep>,
    warnings: &mut Vec<ResolutionWarning>,
    optional: &mut Vec<OptionalDependency>,
) {
    for dep in &version.dependencies {
        match dep.kind {
            DependencyKind::Required => queue.push_back(PendingDep {
                project_id: dep.project_id.clone(),
                version_id: dep.version_id.clone(),
                requested_by: version.project_id.clone(),
                path: path.to_vec(),
                depth,
            }),
            DependencyKind::Optional => optional.push(OptionalDependency {
                project_id: dep.project_id.clone(),
                version_id: dep.version_id.clone(),
                requested_by: version.project_id.clone(),
            }),
            DependencyKind::Embedded => {}
            DependencyKind::Incompatible => warnings.push(ResolutionWarning::Incompatible {
                plugin: dep
                    .project_id
                    .clone()
                    .or_else(|| dep.version_id.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                requested_by: version.project_id.clone(),
            }),
        }
    }
}

fn unresolved_warning(dep: &PendingDep, reason: UnresolvedReason) -> ResolutionWarning {
    ResolutionWarning::Unresolved {
        plugin: dep.label(),
        requested_by: dep.requested_by.clone(),
        reason,
    }
}

fn cycle_warning(plugin: &str, requested_by: &str) -> ResolutionWarning {
    ResolutionWarning::Cycle {
        plugin: plugin.to_string(),
        requested_by: requested_by.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::catalog::{
        CatalogError, DependencyRef, Loader, PluginDetails, PluginSummary, VersionFile,
    };

    /// In-memory catalog recording every call it serves.
    #[derive(Default)]
    struct StubCatalog {
        versions_by_plugin: HashMap<String, Vec<PluginVersion>>,
        versions_by_id: HashMap<String, PluginVersion>,
        calls: Mutex<Vec<String>>,
    }

    impl StubCatalog {
        fn add(&mut self, version: PluginVersion) {
            self.versions_by_id
                .insert(version.id.clone(), version.clone());
            self.versions_by_plugin
                .entry(version.project_id.clone())
                .or_default()
                .push(version);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CatalogClient for StubCatalog {
        async fn search(
            &self,
            _query: &str,
            _filter: &LoaderFilter,
        ) -> Result<Vec<PluginSummary>, CatalogError> {
            unimplemented!("resolver never searches")
        }

        async fn get_plugin(&self, id_or_slug: &str) -> Result<PluginDetails, CatalogError> {
            Err(CatalogError::not_found(id_or_slug))
        }

        async fn get_versions(&self, plugin_id: &str) -> Result<Vec<PluginVersion>, CatalogError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("versions:{plugin_id}"));
            self.versions_by_plugin
                .get(plugin_id)
                .cloned()
                .ok_or_else(|| CatalogError::not_found(plugin_id))
        }

        async fn get_version(&self, version_id: &str) -> Result<PluginVersion, CatalogError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("version:{version_id}"));
            self.versions_by_id
                .get(version_id)
                .cloned()
                .ok_or_else(|| CatalogError::not_found(version_id))
        }
    }

    fn required(project_id: &str) -> DependencyRef {
        DependencyRef {
            project_id: Some(project_id.to_string()),
            version_id: None,
            kind: DependencyKind::Required,
        }
    }

    fn version(
        id: &str,
        project_id: &str,
        loaders: &[Loader],
        day: u32,
        dependencies: Vec<DependencyRef>,
    ) -> PluginVersion {
        PluginVersion {
            id: id.to_string(),
            project_id: project_id.to_string(),
            name: id.to_string(),
            version_number: id.to_string(),
            loaders: loaders.to_vec(),
            dependencies,
            files: vec![VersionFile {
                url: format!("https://cdn.example/{id}.jar"),
                filename: format!("{id}.jar"),
                primary: true,
                size: 100,
            }],
            date_published: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
        }
    }

    fn paper() -> LoaderFilter {
        LoaderFilter::any_of([Loader::Paper])
    }

    #[tokio::test]
    async fn test_root_is_first_and_ids_unique() {
        let mut catalog = StubCatalog::default();
        catalog.add(version("b1", "bee", &[Loader::Paper], 1, Vec::new()));
        catalog.add(version("c1", "cee", &[Loader::Paper], 1, Vec::new()));
        // Both the root and bee require cee; the second requirement dedups.
        let root = version(
            "r1",
            "root",
            &[Loader::Paper],
            1,
            vec![required("bee"), required("cee")],
        );
        catalog.versions_by_plugin.get_mut("bee").unwrap()[0]
            .dependencies
            .push(required("cee"));

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        let ids: Vec<&str> = closure
            .entries
            .iter()
            .map(|e| e.version.project_id.as_str())
            .collect();
        assert_eq!(ids, ["root", "bee", "cee"]);
        assert!(closure.warnings.is_empty());
        // cee was fetched exactly once.
        let fetches = catalog
            .calls()
            .iter()
            .filter(|c| *c == "versions:cee")
            .count();
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn test_two_node_cycle_terminates_with_warning() {
        let mut catalog = StubCatalog::default();
        catalog.add(version(
            "b1",
            "bee",
            &[Loader::Paper],
            1,
            vec![required("aye")],
        ));
        let root = version("a1", "aye", &[Loader::Paper], 1, vec![required("bee")]);

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 2);
        assert_eq!(
            closure.warnings,
            vec![ResolutionWarning::Cycle {
                plugin: "aye".to_string(),
                requested_by: "bee".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_three_node_cycle_terminates_with_warning() {
        let mut catalog = StubCatalog::default();
        catalog.add(version(
            "b1",
            "bee",
            &[Loader::Paper],
            1,
            vec![required("cee")],
        ));
        catalog.add(version(
            "c1",
            "cee",
            &[Loader::Paper],
            1,
            vec![required("aye")],
        ));
        let root = version("a1", "aye", &[Loader::Paper], 1, vec![required("bee")]);

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        let ids: Vec<&str> = closure
            .entries
            .iter()
            .map(|e| e.version.project_id.as_str())
            .collect();
        assert_eq!(ids, ["aye", "bee", "cee"]);
        assert!(matches!(
            closure.warnings.as_slice(),
            [ResolutionWarning::Cycle { plugin, .. }] if plugin == "aye"
        ));
    }

    #[tokio::test]
    async fn test_newest_compatible_version_selected() {
        // Foo requires Bar; Bar v1.0 targets spigot, v1.2 targets paper.
        let mut catalog = StubCatalog::default();
        catalog.add(version("bar-1.0", "bar", &[Loader::Spigot], 1, Vec::new()));
        catalog.add(version("bar-1.2", "bar", &[Loader::Paper], 10, Vec::new()));
        let root = version("foo-2.0", "foo", &[Loader::Paper], 1, vec![required("bar")]);

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 2);
        assert_eq!(closure.entries[1].version.id, "bar-1.2");
        assert!(closure.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_incompatible_warned_never_fetched() {
        let catalog = StubCatalog::default();
        let root = version(
            "r1",
            "root",
            &[Loader::Paper],
            1,
            vec![DependencyRef {
                project_id: Some("clashing".to_string()),
                version_id: None,
                kind: DependencyKind::Incompatible,
            }],
        );

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 1);
        assert_eq!(
            closure.warnings,
            vec![ResolutionWarning::Incompatible {
                plugin: "clashing".to_string(),
                requested_by: "root".to_string(),
            }]
        );
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pinned_dependency_fetched_by_version_id() {
        let mut catalog = StubCatalog::default();
        catalog.add(version("dep-2.3", "dep", &[Loader::Spigot], 1, Vec::new()));
        let root = version(
            "r1",
            "root",
            &[Loader::Paper],
            1,
            vec![DependencyRef {
                project_id: Some("dep".to_string()),
                version_id: Some("dep-2.3".to_string()),
                kind: DependencyKind::Required,
            }],
        );

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        // The pin wins even though dep-2.3 does not declare paper.
        assert_eq!(closure.entries[1].version.id, "dep-2.3");
        assert_eq!(catalog.calls(), vec!["version:dep-2.3"]);
    }

    #[tokio::test]
    async fn test_no_compatible_version_downgraded_to_warning() {
        let mut catalog = StubCatalog::default();
        catalog.add(version("bar-1.0", "bar", &[Loader::Fabric], 1, Vec::new()));
        let root = version("r1", "root", &[Loader::Paper], 1, vec![required("bar")]);

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 1);
        assert_eq!(
            closure.warnings,
            vec![ResolutionWarning::Unresolved {
                plugin: "bar".to_string(),
                requested_by: "root".to_string(),
                reason: UnresolvedReason::NoCompatibleVersion,
            }]
        );
    }

    #[tokio::test]
    async fn test_optional_exposed_not_fetched() {
        let catalog = StubCatalog::default();
        let root = version(
            "r1",
            "root",
            &[Loader::Paper],
            1,
            vec![DependencyRef {
                project_id: Some("nice-to-have".to_string()),
                version_id: None,
                kind: DependencyKind::Optional,
            }],
        );

        let resolver = DependencyResolver::new(&catalog);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 1);
        assert_eq!(closure.optional.len(), 1);
        assert_eq!(closure.optional[0].label(), "nice-to-have");
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_root_without_file_is_fatal() {
        let catalog = StubCatalog::default();
        let mut root = version("r1", "root", &[Loader::Paper], 1, Vec::new());
        root.files.clear();

        let resolver = DependencyResolver::new(&catalog);
        let err = resolver.resolve(root, &paper()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoPrimaryFile { .. }));
    }

    #[tokio::test]
    async fn test_depth_cap_stops_descent() {
        let mut catalog = StubCatalog::default();
        catalog.add(version(
            "b1",
            "bee",
            &[Loader::Paper],
            1,
            vec![required("cee")],
        ));
        catalog.add(version("c1", "cee", &[Loader::Paper], 1, Vec::new()));
        let root = version("a1", "aye", &[Loader::Paper], 1, vec![required("bee")]);

        let resolver = DependencyResolver::with_limits(&catalog, 1, MAX_CLOSURE_SIZE);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 2);
        assert_eq!(
            closure.warnings,
            vec![ResolutionWarning::Unresolved {
                plugin: "cee".to_string(),
                requested_by: "bee".to_string(),
                reason: UnresolvedReason::DepthLimit,
            }]
        );
    }

    #[tokio::test]
    async fn test_size_cap_truncates() {
        let mut catalog = StubCatalog::default();
        catalog.add(version("b1", "bee", &[Loader::Paper], 1, Vec::new()));
        catalog.add(version("c1", "cee", &[Loader::Paper], 1, Vec::new()));
        let root = version(
            "r1",
            "root",
            &[Loader::Paper],
            1,
            vec![required("bee"), required("cee")],
        );

        let resolver = DependencyResolver::with_limits(&catalog, MAX_DEPTH, 2);
        let closure = resolver.resolve(root, &paper()).await.unwrap();

        assert_eq!(closure.entries.len(), 2);
        assert_eq!(
            closure.warnings,
            vec![ResolutionWarning::Truncated { limit: 2 }]
        );
    }
}
