//! # Application Layer
//!
//! The bot's core logic: catalog diffing, announcement formatting, the
//! presence liveness monitor, and the driver that schedules all workers.

pub mod diff;
pub mod formatter;
pub mod liveness;
pub mod scheduler;
