//! # Scheduler / Driver
//!
//! Owns the background workers: one update worker per configured feed, one
//! keepalive worker for the presence monitor, and one dispatcher draining
//! inbound transport events. Workers are independent tasks sharing one
//! transport and one store handle; a slow or failing cycle for one feed
//! never blocks another. Each feed worker runs its cycles sequentially, so
//! at most one cycle per feed is in flight at a time.

use crate::application::diff::diff;
use crate::application::formatter::format;
use crate::application::liveness::LivenessMonitor;
use crate::domain::config::AppConfig;
use crate::domain::error::{FetchError, HeraldError};
use crate::domain::traits::{ChatTransport, InboundEvent, IndexFetcher, KnownStateRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Driver {
    config: AppConfig,
    store: Arc<dyn KnownStateRepository>,
    fetcher: Arc<dyn IndexFetcher>,
    transport: Arc<dyn ChatTransport>,
    monitor: Arc<LivenessMonitor>,
}

impl Driver {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KnownStateRepository>,
        fetcher: Arc<dyn IndexFetcher>,
        transport: Arc<dyn ChatTransport>,
        monitor: Arc<LivenessMonitor>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            transport,
            monitor,
        }
    }

    /// Seed the known state for feeds this bot has never observed before.
    /// Everything in the first fetch becomes known without an announcement;
    /// a failure here is a startup error, since an empty state plus a broken
    /// feed would announce the whole catalog later.
    pub async fn initialize(&self) -> Result<(), HeraldError> {
        for feed in &self.config.feeds {
            if self.store.count(feed)? > 0 {
                continue;
            }
            tracing::info!(feed = %feed, "Initializing known state from index");
            let catalog = self.fetcher.fetch_index(feed).await?;
            let seeded = diff(&catalog, &[], feed);
            self.store.upsert(&seeded.added)?;
            tracing::info!(feed = %feed, apps = seeded.added.len(), "Seeded known state");
        }
        Ok(())
    }

    /// Spawn all workers and hand their handles to the caller.
    pub fn spawn(self, mut inbound: mpsc::Receiver<InboundEvent>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let check_period = Duration::from_secs(self.config.intervals.check);
        for feed in self.config.feeds.clone() {
            let store = self.store.clone();
            let fetcher = self.fetcher.clone();
            let transport = self.transport.clone();
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(check_period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    match run_cycle(store.as_ref(), fetcher.as_ref(), transport.as_ref(), &feed)
                        .await
                    {
                        Ok(()) => {}
                        Err(HeraldError::Fetch(FetchError::Transient(e))) => {
                            tracing::debug!(feed = %feed, "Transient fetch failure, retrying next tick: {}", e);
                        }
                        Err(HeraldError::Fetch(FetchError::Malformed(e))) => {
                            // A broken feed must not be skipped silently forever.
                            tracing::error!(feed = %feed, "Malformed catalog, stopping this feed's worker: {}", e);
                            return;
                        }
                        Err(e) => {
                            tracing::warn!(feed = %feed, "Update cycle failed: {}", e);
                        }
                    }
                }
            }));
        }

        let monitor = self.monitor.clone();
        let keepalive_period = Duration::from_secs(self.config.intervals.keepalive);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(keepalive_period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let _ = monitor.tick().await;
            }
        }));

        let monitor = self.monitor.clone();
        handles.push(tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                monitor.on_event(event).await;
            }
            tracing::warn!("Inbound event stream closed");
        }));

        handles
    }
}

/// One update cycle for one feed: fetch, diff, persist, announce. The
/// announcement depends on the persisted state, so it is only sent once the
/// batch write has succeeded; otherwise the next cycle would re-announce
/// the same changes.
async fn run_cycle(
    store: &dyn KnownStateRepository,
    fetcher: &dyn IndexFetcher,
    transport: &dyn ChatTransport,
    feed: &str,
) -> Result<(), HeraldError> {
    tracing::info!(feed = %feed, "Starting update check");

    let catalog = fetcher.fetch_index(feed).await?;
    let known = store.find_known(feed, &catalog.app_ids())?;
    let classification = diff(&catalog, &known, feed);

    if classification.is_empty() {
        tracing::info!(feed = %feed, "No new or updated apps");
        return Ok(());
    }

    store.upsert(&classification.rows())?;
    tracing::info!(
        feed = %feed,
        added = classification.added.len(),
        updated = classification.updated.len(),
        "Persisted classification"
    );

    if let Some(text) = format(&classification, &catalog.repo.name) {
        transport
            .send_announcement(&text)
            .await
            .map_err(HeraldError::Transport)?;
    }

    Ok(())
}
