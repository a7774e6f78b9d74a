//! # Presence Liveness Monitor
//!
//! Distinguishes a healthy room membership from a silently dropped one.
//! Each cadence tick sends a transport keepalive plus a room-level probe
//! addressed to the bot's own nickname, correlated by a fresh identifier.
//! A probe that is still unresolved when its grace period expires means the
//! room no longer considers us a member, and we rejoin.
//!
//! The probe table is the one piece of process-wide mutable state in the
//! bot. Only three operations touch it (create, resolve, take-for-sweep),
//! all serialized behind its mutex; it is never handed out to callers.

use crate::domain::traits::{ChatTransport, InboundEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One outstanding room-presence check.
#[derive(Debug, Clone)]
struct LivenessProbe {
    created_at: Instant,
    resolved: bool,
}

/// Mutex-guarded table of outstanding probes, keyed by correlation id.
#[derive(Default)]
struct ProbeTable {
    probes: Mutex<HashMap<String, LivenessProbe>>,
}

impl ProbeTable {
    fn create(&self, correlation: &str) {
        let mut probes = self.probes.lock().unwrap_or_else(|e| e.into_inner());
        probes.insert(
            correlation.to_string(),
            LivenessProbe {
                created_at: Instant::now(),
                resolved: false,
            },
        );
    }

    /// Mark a tracked, unresolved probe as resolved. Returns false for an
    /// unknown or already-resolved correlation id.
    fn resolve(&self, correlation: &str) -> bool {
        let mut probes = self.probes.lock().unwrap_or_else(|e| e.into_inner());
        match probes.get_mut(correlation) {
            Some(probe) if !probe.resolved => {
                probe.resolved = true;
                true
            }
            _ => false,
        }
    }

    /// Remove and return a probe for its deferred sweep.
    fn take(&self, correlation: &str) -> Option<LivenessProbe> {
        let mut probes = self.probes.lock().unwrap_or_else(|e| e.into_inner());
        probes.remove(correlation)
    }

    fn len(&self) -> usize {
        self.probes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Drives the probe/timeout/rejoin cycle against the chat transport.
pub struct LivenessMonitor {
    transport: Arc<dyn ChatTransport>,
    probes: ProbeTable,
    grace: Duration,
}

impl LivenessMonitor {
    pub fn new(transport: Arc<dyn ChatTransport>, grace: Duration) -> Self {
        Self {
            transport,
            probes: ProbeTable::default(),
            grace,
        }
    }

    /// One cadence tick: transport keepalive plus a fresh room probe.
    /// Returns the probe's correlation id if one was sent.
    pub async fn tick(self: &Arc<Self>) -> Option<String> {
        if let Err(e) = self.transport.keepalive().await {
            tracing::warn!("Transport keepalive failed: {}", e);
        }

        let correlation = Uuid::new_v4().to_string();
        self.probes.create(&correlation);

        if let Err(e) = self.transport.send_probe(&correlation).await {
            tracing::warn!("Failed to send room probe: {}", e);
            self.probes.take(&correlation);
            return None;
        }
        tracing::debug!(probe = %correlation, "Sent room liveness probe");

        // Deferred check, independent of the cadence timer.
        let monitor = Arc::clone(self);
        let probe = correlation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(monitor.grace).await;
            monitor.sweep(&probe).await;
        });

        Some(correlation)
    }

    /// The deferred check for one probe. A resolved probe is discarded
    /// silently; an unresolved one means our membership silently lapsed,
    /// so we rejoin. Either way the entry is gone afterwards, which is
    /// what bounds the rejoin to exactly once per timed-out probe.
    pub async fn sweep(&self, correlation: &str) {
        let Some(probe) = self.probes.take(correlation) else {
            return;
        };
        if probe.resolved {
            return;
        }
        tracing::warn!(
            probe = %correlation,
            elapsed_ms = probe.created_at.elapsed().as_millis() as u64,
            "Room probe went unanswered, rejoining"
        );
        self.rejoin().await;
    }

    /// Exhaustive dispatch of inbound transport events.
    pub async fn on_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::LivenessResponse { correlation } => {
                if self.probes.resolve(&correlation) {
                    tracing::debug!(probe = %correlation, "Room probe answered");
                } else {
                    tracing::debug!(probe = %correlation, "Ignoring unmatched probe response");
                }
            }
            InboundEvent::LivenessRequest { correlation, from } => {
                tracing::debug!(from = %from, "Answering liveness request");
                if let Err(e) = self.transport.send_affirmative(&correlation, &from).await {
                    tracing::warn!("Failed to answer liveness request: {}", e);
                }
            }
            InboundEvent::GenericRequest { correlation, from } => {
                if let Err(e) = self.transport.send_unavailable(&from, &correlation).await {
                    tracing::warn!("Failed to send service-unavailable reply: {}", e);
                }
            }
            InboundEvent::MembershipError { from } => {
                // Fast path: no need to wait for a probe to time out.
                tracing::warn!(from = %from, "Membership error received, rejoining");
                self.rejoin().await;
            }
            InboundEvent::RoomMessage { .. } => {}
        }
    }

    /// Rejoin failures are logged and left for the next cadence tick.
    async fn rejoin(&self) {
        if let Err(e) = self.transport.join_room().await {
            tracing::error!("Room rejoin failed: {}", e);
        } else {
            tracing::info!("Rejoined room after liveness failure");
        }
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.probes.len()
    }
}
