//! # Catalog Model
//!
//! Immutable value types for one fetched catalog snapshot, mapped onto the
//! F-Droid index-v1 JSON layout (`repo`, `apps`, `packages`). A snapshot is
//! owned by a single update cycle and discarded after diffing.

use serde::Deserialize;
use std::collections::HashMap;

/// A parsed catalog index as served by one feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub repo: RepoInfo,
    #[serde(default)]
    pub apps: Vec<CatalogEntry>,
    #[serde(default)]
    pub packages: HashMap<String, Vec<VersionRecord>>,
}

impl Catalog {
    /// All application identifiers advertised by this snapshot.
    pub fn app_ids(&self) -> Vec<String> {
        self.apps.iter().map(|app| app.package.clone()).collect()
    }

    /// Version records for one application, empty if the index carries none.
    pub fn versions_of(&self, app_id: &str) -> &[VersionRecord] {
        self.packages.get(app_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub name: String,
}

/// One application as advertised by the feed at fetch time.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "packageName")]
    pub package: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub localized: Localized,
}

impl CatalogEntry {
    /// Resolved display name: the localized override wins when present and
    /// non-empty, otherwise the default name.
    pub fn display_name(&self) -> &str {
        if !self.localized.en_us.name.is_empty() {
            &self.localized.en_us.name
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Localized {
    #[serde(rename = "en-US", default)]
    pub en_us: LocalizedName,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedName {
    #[serde(default)]
    pub name: String,
}

/// One release of an application. The version code is the sole ordering key.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionRecord {
    #[serde(rename = "versionCode", default)]
    pub code: i64,
    #[serde(rename = "versionName", default)]
    pub name: String,
}
