//! # Domain Types
//!
//! Durable and derived records exchanged between the diff engine, the
//! known-state store and the notification formatter.

/// The durable record of an application previously seen for a given feed.
///
/// At most one live record exists per (feed, app_id) pair; a record is
/// created on first observation, mutated in place on a version bump and
/// never deleted by this bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownApp {
    pub app_id: String,
    pub name: String,
    pub version: String,
    pub version_code: i64,
    pub feed: String,
}

/// The diff engine's output for one update cycle.
///
/// `added` and `updated` are disjoint by application identifier; apps that
/// vanished from the feed are left untouched (no "removed" class exists).
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub added: Vec<KnownApp>,
    pub updated: Vec<KnownApp>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }

    /// All rows this cycle needs to persist, additions first.
    pub fn rows(&self) -> Vec<KnownApp> {
        let mut rows = self.added.clone();
        rows.extend(self.updated.iter().cloned());
        rows
    }
}
