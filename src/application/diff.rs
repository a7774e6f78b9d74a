//! # Catalog Diff Engine
//!
//! Pure classification of a freshly fetched catalog against the previously
//! persisted state: which apps are new, which received a version bump, and
//! which are left untouched. The caller persists the result and renders the
//! announcement; this module performs no I/O.

use crate::domain::catalog::{Catalog, CatalogEntry, VersionRecord};
use crate::domain::types::{Classification, KnownApp};
use std::collections::{HashMap, HashSet};

/// Classify a fetched catalog against the known state for one feed.
///
/// A known app moves to `updated` only when the maximum version code among
/// its fetched version records is strictly greater than the persisted one;
/// the display name is re-resolved at fetch time. A fetched app with no
/// prior record becomes `added`, carrying its highest version pair. Apps
/// with zero version records and apps absent from the fetched catalog are
/// left untouched. Both output sets are sorted case-insensitively by
/// display name so repeated runs are reproducible regardless of the index's
/// internal ordering.
pub fn diff(catalog: &Catalog, known: &[KnownApp], feed: &str) -> Classification {
    let entries: HashMap<&str, &CatalogEntry> = catalog
        .apps
        .iter()
        .map(|app| (app.package.as_str(), app))
        .collect();
    let known_ids: HashSet<&str> = known.iter().map(|app| app.app_id.as_str()).collect();

    let mut updated = Vec::new();
    for app in known {
        let Some(entry) = entries.get(app.app_id.as_str()) else {
            // Delisted from the feed; the durable record stays as-is.
            continue;
        };
        let Some(latest) = latest_version(catalog.versions_of(&app.app_id)) else {
            continue;
        };
        if latest.code > app.version_code {
            updated.push(KnownApp {
                app_id: app.app_id.clone(),
                name: entry.display_name().to_string(),
                version: latest.name.clone(),
                version_code: latest.code,
                feed: feed.to_string(),
            });
        }
    }

    let mut added = Vec::new();
    for entry in &catalog.apps {
        if known_ids.contains(entry.package.as_str()) {
            continue;
        }
        // No version record means nothing to report; skip entirely.
        let Some(latest) = latest_version(catalog.versions_of(&entry.package)) else {
            continue;
        };
        added.push(KnownApp {
            app_id: entry.package.clone(),
            name: entry.display_name().to_string(),
            version: latest.name.clone(),
            version_code: latest.code,
            feed: feed.to_string(),
        });
    }

    sort_by_display_name(&mut added);
    sort_by_display_name(&mut updated);

    Classification { added, updated }
}

/// Highest-version-code record. Ties keep the first record encountered;
/// codes should never tie within one app's lifetime.
fn latest_version(records: &[VersionRecord]) -> Option<&VersionRecord> {
    let mut latest: Option<&VersionRecord> = None;
    for record in records {
        match latest {
            Some(best) if record.code <= best.code => {}
            _ => latest = Some(record),
        }
    }
    latest
}

fn sort_by_display_name(apps: &mut [KnownApp]) {
    apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogEntry, Localized, LocalizedName, RepoInfo};

    fn entry(package: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            package: package.into(),
            name: name.into(),
            localized: Localized::default(),
        }
    }

    fn catalog(apps: Vec<CatalogEntry>, packages: Vec<(&str, Vec<(i64, &str)>)>) -> Catalog {
        Catalog {
            repo: RepoInfo {
                name: "Test Repo".into(),
            },
            apps,
            packages: packages
                .into_iter()
                .map(|(id, versions)| {
                    (
                        id.to_string(),
                        versions
                            .into_iter()
                            .map(|(code, name)| VersionRecord {
                                code,
                                name: name.into(),
                            })
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    fn known(app_id: &str, name: &str, code: i64) -> KnownApp {
        KnownApp {
            app_id: app_id.into(),
            name: name.into(),
            version: "old".into(),
            version_code: code,
            feed: "feed".into(),
        }
    }

    #[test]
    fn test_added_and_updated_example_scenario() {
        // Known com.a@3; the fetch carries com.a with codes [3, 5] and a
        // brand-new com.b with [1].
        let catalog = catalog(
            vec![entry("com.a", "Alpha"), entry("com.b", "Beta")],
            vec![
                ("com.a", vec![(3, "1.0"), (5, "1.2")]),
                ("com.b", vec![(1, "0.1")]),
            ],
        );
        let state = vec![known("com.a", "Alpha", 3)];

        let result = diff(&catalog, &state, "feed");

        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].app_id, "com.b");
        assert_eq!(result.added[0].version_code, 1);
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].app_id, "com.a");
        assert_eq!(result.updated[0].version_code, 5);
        assert_eq!(result.updated[0].version, "1.2");
    }

    #[test]
    fn test_second_run_is_empty() {
        // Re-running against the already-updated known set must classify
        // nothing; that is what keeps announcements from repeating.
        let catalog = catalog(
            vec![entry("com.a", "Alpha"), entry("com.b", "Beta")],
            vec![
                ("com.a", vec![(3, "1.0"), (5, "1.2")]),
                ("com.b", vec![(1, "0.1")]),
            ],
        );
        let state = vec![known("com.a", "Alpha", 5), known("com.b", "Beta", 1)];

        let result = diff(&catalog, &state, "feed");
        assert!(result.is_empty());
    }

    #[test]
    fn test_no_double_counting() {
        let catalog = catalog(
            vec![entry("com.a", "Alpha")],
            vec![("com.a", vec![(9, "2.0")])],
        );
        let state = vec![known("com.a", "Alpha", 3)];

        let result = diff(&catalog, &state, "feed");
        let in_added = result.added.iter().any(|a| a.app_id == "com.a");
        let in_updated = result.updated.iter().any(|a| a.app_id == "com.a");
        assert!(!(in_added && in_updated));
        assert!(in_updated);
    }

    #[test]
    fn test_equal_or_lower_code_is_not_an_update() {
        let catalog = catalog(
            vec![entry("com.a", "Alpha")],
            vec![("com.a", vec![(2, "0.9"), (3, "1.0")])],
        );
        let state = vec![known("com.a", "Alpha", 3)];

        let result = diff(&catalog, &state, "feed");
        assert!(result.is_empty());
    }

    #[test]
    fn test_known_app_missing_version_records_left_unchanged() {
        let catalog = catalog(vec![entry("com.a", "Alpha")], vec![]);
        let state = vec![known("com.a", "Alpha", 3)];

        let result = diff(&catalog, &state, "feed");
        assert!(result.is_empty());
    }

    #[test]
    fn test_new_app_without_versions_is_skipped() {
        let catalog = catalog(vec![entry("com.a", "Alpha")], vec![]);

        let result = diff(&catalog, &[], "feed");
        assert!(result.is_empty());
    }

    #[test]
    fn test_app_absent_from_fetch_left_untouched() {
        let catalog = catalog(
            vec![entry("com.b", "Beta")],
            vec![("com.b", vec![(1, "0.1")])],
        );
        let state = vec![known("com.a", "Alpha", 3)];

        let result = diff(&catalog, &state, "feed");
        assert_eq!(result.added.len(), 1);
        assert!(result.updated.is_empty());
    }

    #[test]
    fn test_empty_known_set_adds_everything_with_versions() {
        let catalog = catalog(
            vec![entry("com.a", "Alpha"), entry("com.b", "Beta")],
            vec![
                ("com.a", vec![(3, "1.0")]),
                ("com.b", vec![(1, "0.1")]),
            ],
        );

        let result = diff(&catalog, &[], "feed");
        assert_eq!(result.added.len(), 2);
        assert!(result.updated.is_empty());
    }

    #[test]
    fn test_output_sorted_case_insensitively() {
        let catalog = catalog(
            vec![
                entry("com.z", "zebra"),
                entry("com.b", "Banana"),
                entry("com.a", "apple"),
            ],
            vec![
                ("com.z", vec![(1, "1")]),
                ("com.b", vec![(1, "1")]),
                ("com.a", vec![(1, "1")]),
            ],
        );

        let result = diff(&catalog, &[], "feed");
        let names: Vec<&str> = result.added.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "Banana", "zebra"]);
    }

    #[test]
    fn test_localized_name_resolved_on_update() {
        let mut localized = entry("com.a", "Alpha");
        localized.localized = Localized {
            en_us: LocalizedName {
                name: "Alpha Prime".into(),
            },
        };
        let catalog = catalog(vec![localized], vec![("com.a", vec![(5, "1.2")])]);
        let state = vec![known("com.a", "Alpha", 3)];

        let result = diff(&catalog, &state, "feed");
        assert_eq!(result.updated[0].name, "Alpha Prime");
    }

    #[test]
    fn test_latest_version_tie_keeps_first() {
        let records = vec![
            VersionRecord {
                code: 5,
                name: "first".into(),
            },
            VersionRecord {
                code: 5,
                name: "second".into(),
            },
        ];
        assert_eq!(latest_version(&records).unwrap().name, "first");
    }
}
