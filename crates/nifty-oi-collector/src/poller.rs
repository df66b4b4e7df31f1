//! The polling loop: fetch → normalize → update state, and an independent
//! persist timer feeding the snapshot sinks.
//!
//! Single producer: one task owns the source and the sinks. Refresh and
//! persist run on independent timers and never block one another; a failed
//! refresh leaves the last good snapshot displayed, and a failed persist is
//! retried on the next persist tick rather than in a tight loop. The only
//! exit path is the stop signal; an in-flight fetch is allowed to complete
//! and its result discarded.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use nifty_oi_chain::{chain::resolve_expiry, normalize, Snapshot};

use crate::client::{ChainSource, CollectorError};
use crate::config::CollectorConfig;
use crate::sink::SnapshotSink;
use crate::state::{DashboardState, DashboardView};

/// One sink plus its own dedup cursor. Tracked per sink: a failed append on
/// one sink must not cause a retry to duplicate rows in the others.
struct SinkSlot {
    sink: Box<dyn SnapshotSink>,
    /// Timestamp of the last snapshot this sink accepted.
    last_persisted: Option<chrono::DateTime<Utc>>,
}

pub struct Poller<S: ChainSource> {
    source: S,
    config: CollectorConfig,
    state: Arc<RwLock<DashboardState>>,
    sinks: Vec<SinkSlot>,
}

impl<S: ChainSource> Poller<S> {
    pub fn new(
        source: S,
        config: CollectorConfig,
        state: Arc<RwLock<DashboardState>>,
        sinks: Vec<Box<dyn SnapshotSink>>,
    ) -> Self {
        Self {
            source,
            config,
            state,
            sinks: sinks
                .into_iter()
                .map(|sink| SinkSlot {
                    sink,
                    last_persisted: None,
                })
                .collect(),
        }
    }

    /// Run until the stop signal fires.
    ///
    /// `refresh_rx` delivers manual "refresh now" requests that bypass the
    /// interval gate; `stop_rx` is the only way out of the loop.
    pub async fn run(
        mut self,
        mut refresh_rx: mpsc::Receiver<()>,
        mut stop_rx: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut fetch_tick = interval(Duration::from_secs(self.config.poll.interval_secs));
        fetch_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut persist_tick =
            interval(Duration::from_secs(self.config.poll.persist_interval_secs));
        persist_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.poll.interval_secs,
            persist_interval_secs = self.config.poll.persist_interval_secs,
            auto_refresh = self.config.poll.auto_refresh,
            symbol = %self.config.source.symbol,
            "poller started"
        );

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    // A dropped sender counts as a stop request too.
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("stop requested, exiting polling loop");
                        break;
                    }
                }
                _ = fetch_tick.tick() => {
                    if self.config.poll.auto_refresh {
                        self.refresh().await;
                    }
                }
                Some(()) = refresh_rx.recv() => {
                    debug!("manual refresh requested");
                    self.refresh().await;
                }
                _ = persist_tick.tick() => {
                    self.persist().await;
                }
            }
        }

        // Final persist so a stop never loses the last snapshot.
        self.persist().await;
        for slot in &mut self.sinks {
            if let Err(e) = slot.sink.flush() {
                warn!(sink = slot.sink.name(), error = %e, "flush on shutdown failed");
            }
        }
        Ok(())
    }

    /// One fetch-normalize-update cycle. Errors are recorded, never fatal.
    async fn refresh(&mut self) {
        let result = self.poll_once().await;
        let next_due =
            Utc::now() + ChronoDuration::seconds(self.config.poll.interval_secs as i64);

        let mut state = self.state.write().await;
        state.next_due = Some(next_due);
        match result {
            Ok((snapshot, view)) => {
                info!(
                    expiry = %snapshot.expiry,
                    spot = snapshot.spot,
                    strikes = snapshot.rows.len(),
                    sentiment = %view.full_chain.sentiment,
                    "snapshot updated"
                );
                state.on_snapshot(snapshot, view);
            }
            Err(e) => {
                warn!(error = %e, "poll failed, keeping last good snapshot");
                state.on_failure(e.to_string());
            }
        }
    }

    async fn poll_once(&self) -> Result<(Snapshot, DashboardView), CollectorError> {
        let chain = self.source.fetch().await?;
        let expiry = resolve_expiry(&chain, self.config.source.expiry.as_deref())?;
        let rows = normalize(&chain, &expiry)?;
        let snapshot = Snapshot::new(Utc::now(), expiry, chain.spot(), rows);
        let view = DashboardView::build(
            &snapshot,
            &self.config.window,
            self.config.sentiment.threshold,
        );
        Ok((snapshot, view))
    }

    /// Append the last good snapshot to every sink that has not taken it
    /// yet. A failed sink is retried on the next tick; sinks that already
    /// accepted the snapshot are skipped, never re-appended.
    async fn persist(&mut self) {
        let snapshot = {
            let state = self.state.read().await;
            match &state.last_snapshot {
                Some(s) => s.clone(),
                None => return,
            }
        };

        for slot in &mut self.sinks {
            if slot.last_persisted == Some(snapshot.timestamp) {
                continue;
            }
            match slot.sink.append(&snapshot) {
                Ok(()) => {
                    slot.last_persisted = Some(snapshot.timestamp);
                    debug!(sink = slot.sink.name(), ts = %snapshot.timestamp, "snapshot persisted");
                }
                Err(e) => {
                    warn!(sink = slot.sink.name(), error = %e, "snapshot append failed, will retry next tick");
                }
            }
        }
    }
}
