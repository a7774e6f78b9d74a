//! # Index Fetcher
//!
//! Retrieves a feed's `index-v1.jar` over HTTP and decodes it into a
//! catalog snapshot. The jar is a zip archive wrapping `index-v1.json`.
//! Network failures are transient (retried on the next cadence tick);
//! decoding failures are a permanent misconfiguration of that feed.

use crate::domain::catalog::Catalog;
use crate::domain::error::FetchError;
use crate::domain::traits::IndexFetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::time::Duration;
use zip::ZipArchive;

const INDEX_FILE: &str = "index-v1.jar";
const INDEX_ENTRY: &str = "index-v1.json";

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("fdroid-herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl IndexFetcher for Fetcher {
    /// Fetch and decode one feed's index.
    async fn fetch_index(&self, base: &str) -> Result<Catalog, FetchError> {
        let url = index_url(base)?;
        tracing::debug!(url = %url, "Fetching index");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 || status.as_u16() == 408 {
            return Err(FetchError::Transient(format!("{} answered {}", url, status)));
        }
        if !status.is_success() {
            return Err(FetchError::Malformed(format!("{} answered {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        parse_archive(&bytes)
    }
}

/// Build the index URL from a feed's base address: query string stripped,
/// `index-v1.jar` appended to the path.
fn index_url(base: &str) -> Result<reqwest::Url, FetchError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| FetchError::Malformed(format!("invalid feed address {base}: {e}")))?;
    url.set_query(None);
    let path = format!("{}/{}", url.path().trim_end_matches('/'), INDEX_FILE);
    url.set_path(&path);
    Ok(url)
}

/// Unpack the jar and parse the JSON index inside it.
fn parse_archive(bytes: &[u8]) -> Result<Catalog, FetchError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| FetchError::Malformed(format!("not a zip archive: {e}")))?;
    let entry = archive
        .by_name(INDEX_ENTRY)
        .map_err(|e| FetchError::Malformed(format!("missing {INDEX_ENTRY}: {e}")))?;
    serde_json::from_reader(entry).map_err(|e| FetchError::Malformed(format!("bad index JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn jar_with(entry_name: &str, content: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(entry_name, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_index_url_appends_jar_and_strips_query() {
        let url = index_url("https://f-droid.org/repo?fingerprint=abc").unwrap();
        assert_eq!(url.as_str(), "https://f-droid.org/repo/index-v1.jar");
    }

    #[test]
    fn test_index_url_tolerates_trailing_slash() {
        let url = index_url("https://f-droid.org/repo/").unwrap();
        assert_eq!(url.as_str(), "https://f-droid.org/repo/index-v1.jar");
    }

    #[test]
    fn test_index_url_rejects_garbage() {
        assert!(matches!(
            index_url("not a url"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_archive_roundtrip() {
        let jar = jar_with(
            INDEX_ENTRY,
            r#"{ "repo": { "name": "Test" }, "apps": [], "packages": {} }"#,
        );
        let catalog = parse_archive(&jar).unwrap();
        assert_eq!(catalog.repo.name, "Test");
    }

    #[test]
    fn test_parse_archive_rejects_non_zip() {
        assert!(matches!(
            parse_archive(b"plainly not a zip"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_archive_rejects_missing_entry() {
        let jar = jar_with("other.json", "{}");
        assert!(matches!(parse_archive(&jar), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_parse_archive_rejects_bad_json() {
        let jar = jar_with(INDEX_ENTRY, "not json at all");
        assert!(matches!(parse_archive(&jar), Err(FetchError::Malformed(_))));
    }
}
