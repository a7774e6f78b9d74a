//! # Known-State Store
//!
//! SQLite-backed repository of the applications previously seen per feed.
//! One row per (feed, app_id); rows are created on first observation and
//! mutated in place on a version bump. All cycle writes go through one
//! batched upsert inside a single transaction.

use crate::domain::error::{HeraldError, HeraldResult};
use crate::domain::traits::KnownStateRepository;
use crate::domain::types::KnownApp;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

// Keep IN-list sizes well under SQLite's bound-variable limit.
const FIND_CHUNK: usize = 500;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> HeraldResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| HeraldError::Persistence(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> HeraldResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| HeraldError::Persistence("database mutex poisoned".to_string()))
    }
}

impl KnownStateRepository for Store {
    fn count(&self, feed: &str) -> HeraldResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM known_apps WHERE feed = ?1",
            params![feed],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn find_known(&self, feed: &str, app_ids: &[String]) -> HeraldResult<Vec<KnownApp>> {
        let conn = self.lock()?;
        let mut found = Vec::new();

        for chunk in app_ids.chunks(FIND_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT app_id, name, version, version_code, feed
                 FROM known_apps WHERE feed = ? AND app_id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;

            let mut bindings: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() + 1);
            bindings.push(&feed);
            for id in chunk {
                bindings.push(id);
            }

            let rows = stmt.query_map(&bindings[..], |row| {
                Ok(KnownApp {
                    app_id: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    version_code: row.get(3)?,
                    feed: row.get(4)?,
                })
            })?;
            for row in rows {
                found.push(row?);
            }
        }

        Ok(found)
    }

    /// All-or-nothing inside one transaction.
    fn upsert(&self, apps: &[KnownApp]) -> HeraldResult<()> {
        if apps.is_empty() {
            return Ok(());
        }
        let now = Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO known_apps (feed, app_id, name, version, version_code, first_seen, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT (feed, app_id) DO UPDATE SET
                     name = excluded.name,
                     version = excluded.version,
                     version_code = excluded.version_code,
                     last_seen = excluded.last_seen",
            )?;
            for app in apps {
                stmt.execute(params![
                    app.feed,
                    app.app_id,
                    app.name,
                    app.version,
                    app.version_code,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("herald.sqlite")).unwrap();
        (store, dir)
    }

    fn app(feed: &str, app_id: &str, code: i64) -> KnownApp {
        KnownApp {
            app_id: app_id.into(),
            name: format!("App {app_id}"),
            version: format!("v{code}"),
            version_code: code,
            feed: feed.into(),
        }
    }

    #[test]
    fn test_upsert_then_find_roundtrip() {
        let (store, _dir) = store();
        store
            .upsert(&[app("f1", "com.a", 3), app("f1", "com.b", 1)])
            .unwrap();

        let found = store
            .find_known("f1", &["com.a".into(), "com.b".into(), "com.c".into()])
            .unwrap();
        assert_eq!(found.len(), 2);
        let a = found.iter().find(|k| k.app_id == "com.a").unwrap();
        assert_eq!(a.version_code, 3);
        assert_eq!(a.version, "v3");
    }

    #[test]
    fn test_find_is_scoped_to_feed() {
        let (store, _dir) = store();
        store
            .upsert(&[app("f1", "com.a", 3), app("f2", "com.a", 7)])
            .unwrap();

        let found = store.find_known("f2", &["com.a".into()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version_code, 7);
    }

    #[test]
    fn test_upsert_mutates_in_place() {
        let (store, _dir) = store();
        store.upsert(&[app("f1", "com.a", 3)]).unwrap();
        store.upsert(&[app("f1", "com.a", 5)]).unwrap();

        // Still one live row per (feed, app_id), now carrying the bump.
        assert_eq!(store.count("f1").unwrap(), 1);
        let found = store.find_known("f1", &["com.a".into()]).unwrap();
        assert_eq!(found[0].version_code, 5);
    }

    #[test]
    fn test_count_per_feed() {
        let (store, _dir) = store();
        assert_eq!(store.count("f1").unwrap(), 0);

        store
            .upsert(&[app("f1", "com.a", 1), app("f1", "com.b", 1), app("f2", "com.c", 1)])
            .unwrap();
        assert_eq!(store.count("f1").unwrap(), 2);
        assert_eq!(store.count("f2").unwrap(), 1);
    }

    #[test]
    fn test_find_known_spans_chunk_boundary() {
        let (store, _dir) = store();
        let apps: Vec<KnownApp> = (0..FIND_CHUNK + 10)
            .map(|i| app("f1", &format!("com.app{i:04}"), 1))
            .collect();
        store.upsert(&apps).unwrap();

        let ids: Vec<String> = apps.iter().map(|a| a.app_id.clone()).collect();
        let found = store.find_known("f1", &ids).unwrap();
        assert_eq!(found.len(), apps.len());
    }

    #[test]
    fn test_empty_upsert_is_a_noop() {
        let (store, _dir) = store();
        store.upsert(&[]).unwrap();
        assert_eq!(store.count("f1").unwrap(), 0);
    }
}
