//! # Infrastructure Layer
//!
//! Handles interactions with external systems: the Matrix homeserver, the
//! feed HTTP endpoints, and the local SQLite state database. Implements the
//! traits defined in the Domain layer (ChatTransport).

pub mod fetch;
pub mod matrix;
pub mod store;
