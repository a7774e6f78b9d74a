//! # Domain Traits
//!
//! Abstract interfaces for the bot's external collaborators (chat
//! transport, known-state repository, index fetcher) plus the closed set of
//! inbound event kinds. Events are decided once at the transport boundary
//! so the core's dispatch is an exhaustive match with no fallthrough
//! ambiguity.

use crate::domain::catalog::Catalog;
use crate::domain::error::{FetchError, HeraldResult};
use crate::domain::types::KnownApp;
use async_trait::async_trait;

/// Abstract interface for the group-chat transport (e.g., Matrix).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post an announcement into the configured room.
    async fn send_announcement(&self, text: &str) -> Result<(), String>;

    /// Send a room-level liveness probe addressed to the bot's own
    /// room-nickname address, carrying the given correlation identifier.
    async fn send_probe(&self, correlation: &str) -> Result<(), String>;

    /// Answer an inbound liveness request affirmatively.
    async fn send_affirmative(&self, correlation: &str, to: &str) -> Result<(), String>;

    /// Answer a request the bot cannot interpret with a standardized
    /// service-unavailable error, so the peer does not retry forever.
    async fn send_unavailable(&self, to: &str, correlation: &str) -> Result<(), String>;

    /// (Re-)establish room membership.
    async fn join_room(&self) -> Result<(), String>;

    /// Transport-level keepalive round trip, not correlation-tracked.
    async fn keepalive(&self) -> Result<(), String>;
}

/// Abstract interface for the durable known-state repository.
pub trait KnownStateRepository: Send + Sync {
    /// Number of known apps for one feed. Zero means the feed has never
    /// been observed and needs a full initialization pass.
    fn count(&self, feed: &str) -> HeraldResult<i64>;

    /// The known records for one feed, restricted to the given app ids.
    fn find_known(&self, feed: &str, app_ids: &[String]) -> HeraldResult<Vec<KnownApp>>;

    /// Batch write for one cycle: new rows are inserted, existing rows are
    /// updated in place.
    fn upsert(&self, apps: &[KnownApp]) -> HeraldResult<()>;
}

/// Abstract interface for retrieving and decoding a feed's index.
#[async_trait]
pub trait IndexFetcher: Send + Sync {
    async fn fetch_index(&self, base: &str) -> Result<Catalog, FetchError>;
}

/// Inbound events as classified at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The bot is being pinged and must answer affirmatively.
    LivenessRequest { correlation: String, from: String },
    /// Echo of one of our own probes.
    LivenessResponse { correlation: String },
    /// Ordinary room traffic, not addressed to the bot.
    RoomMessage { from: String, body: String },
    /// A request the bot does not understand.
    GenericRequest { correlation: String, from: String },
    /// The server signalled that our room presence is no longer acceptable.
    MembershipError { from: String },
}
