//! Loader compatibility filtering.

use crate::catalog::{LoaderFilter, PluginVersion};

/// Narrow `versions` to those compatible with the loader filter, newest
/// first.
///
/// Pure function: no I/O, no errors; empty input yields empty output.
/// Publication-date ties keep their input order (the sort is stable), so
/// the remote's own ordering breaks ties.
pub fn filter_by_loader(mut versions: Vec<PluginVersion>, filter: &LoaderFilter) -> Vec<PluginVersion> {
    versions.retain(|v| filter.matches(&v.loaders));
    versions.sort_by(|a, b| b.date_published.cmp(&a.date_published));
    versions
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::catalog::{Loader, VersionFile};

    fn version(id: &str, loaders: &[Loader], day: u32) -> PluginVersion {
        PluginVersion {
            id: id.to_string(),
            project_id: "p1".to_string(),
            name: id.to_string(),
            version_number: id.to_string(),
            loaders: loaders.to_vec(),
            dependencies: Vec::new(),
            files: vec![VersionFile {
                url: format!("https://cdn.example/{id}.jar"),
                filename: format!("{id}.jar"),
                primary: true,
                size: 10,
            }],
            date_published: Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_filter_is_exact() {
        let versions = vec![
            version("a", &[Loader::Paper], 1),
            version("b", &[Loader::Fabric], 2),
            version("c", &[Loader::Spigot, Loader::Paper], 3),
        ];
        let filter = LoaderFilter::any_of([Loader::Paper]);
        let kept = filter_by_loader(versions, &filter);
        let ids: Vec<&str> = kept.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
        assert!(kept.iter().all(|v| filter.matches(&v.loaders)));
    }

    #[test]
    fn test_newest_first() {
        let versions = vec![
            version("old", &[Loader::Paper], 1),
            version("new", &[Loader::Paper], 20),
            version("mid", &[Loader::Paper], 10),
        ];
        let kept = filter_by_loader(versions, &LoaderFilter::any_of([Loader::Paper]));
        let ids: Vec<&str> = kept.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let versions = vec![
            version("first", &[Loader::Paper], 5),
            version("second", &[Loader::Paper], 5),
            version("third", &[Loader::Paper], 5),
        ];
        let kept = filter_by_loader(versions, &LoaderFilter::Any);
        let ids: Vec<&str> = kept.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn test_any_filter_keeps_all_but_sorts() {
        let versions = vec![
            version("a", &[Loader::Fabric], 1),
            version("b", &[Loader::Paper], 2),
        ];
        let kept = filter_by_loader(versions, &LoaderFilter::Any);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id, "b");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(filter_by_loader(Vec::new(), &LoaderFilter::Any).is_empty());
    }
}
