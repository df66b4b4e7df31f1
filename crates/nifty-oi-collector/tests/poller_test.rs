//! Polling-loop behavior: last-good-value fallback, independent persist
//! timer, manual refresh, and the stop signal as the only exit path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::timeout;

use nifty_oi_chain::{ChainError, RawOptionChain, Snapshot};
use nifty_oi_collector::client::{ChainSource, CollectorError};
use nifty_oi_collector::config::CollectorConfig;
use nifty_oi_collector::poller::Poller;
use nifty_oi_collector::sink::{SinkError, SnapshotSink};
use nifty_oi_collector::state::DashboardState;

const PAYLOAD: &str = r#"{
    "records": {
        "expiryDates": ["30-Jan-2026"],
        "underlyingValue": 24010.0,
        "data": [
            {
                "strikePrice": 24000,
                "expiryDate": "30-Jan-2026",
                "CE": {"lastPrice": 110.0, "openInterest": 1500, "changeinOpenInterest": 100},
                "PE": {"lastPrice": 95.0, "openInterest": 1100, "changeinOpenInterest": -50}
            },
            {
                "strikePrice": 24050,
                "expiryDate": "30-Jan-2026",
                "CE": {"lastPrice": 80.0, "openInterest": 1200, "changeinOpenInterest": 20},
                "PE": {"lastPrice": 120.0, "openInterest": 900, "changeinOpenInterest": 10}
            }
        ]
    }
}"#;

/// Scripted source: pops one pre-arranged result per fetch.
struct ScriptedSource {
    results: Mutex<VecDeque<Result<RawOptionChain, CollectorError>>>,
}

impl ScriptedSource {
    fn new(results: Vec<Result<RawOptionChain, CollectorError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }
}

#[async_trait]
impl ChainSource for ScriptedSource {
    async fn fetch(&self) -> Result<RawOptionChain, CollectorError> {
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(CollectorError::Malformed(ChainError::MalformedPayload(
                    "script exhausted".to_string(),
                )))
            })
    }
}

/// Sink whose backing store outlives the poller, for assertions.
#[derive(Clone, Default)]
struct SharedSink {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl SnapshotSink for SharedSink {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "shared"
    }
}

/// Sink that rejects a set number of appends before accepting.
struct FlakySink {
    failures_left: u32,
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl SnapshotSink for FlakySink {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SinkError::Encode("append rejected".to_string()));
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn manual_config() -> CollectorConfig {
    let mut config = CollectorConfig::default();
    // Interval timers stay quiet; the test drives refreshes by hand.
    config.poll.auto_refresh = false;
    config.poll.interval_secs = 600;
    config.poll.persist_interval_secs = 1;
    config
}

#[tokio::test]
async fn failed_poll_keeps_last_good_snapshot_and_loop_alive() {
    let source = ScriptedSource::new(vec![
        Ok(RawOptionChain::from_json(PAYLOAD).unwrap()),
        Err(CollectorError::Malformed(ChainError::MalformedPayload(
            "boom".to_string(),
        ))),
    ]);
    let state = Arc::new(RwLock::new(DashboardState::default()));
    let sink = SharedSink::default();
    let poller = Poller::new(
        source,
        manual_config(),
        state.clone(),
        vec![Box::new(sink.clone())],
    );

    let (refresh_tx, refresh_rx) = mpsc::channel(4);
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(poller.run(refresh_rx, stop_rx));

    // First refresh succeeds.
    refresh_tx.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let s = state.read().await;
        assert_eq!(s.polls, 1);
        assert_eq!(s.failures, 0);
        assert!(s.last_error.is_none());
        let view = s.last_view.as_ref().expect("view after first poll");
        assert_eq!(view.nearest_strike, Some(24000));
        assert_eq!(view.full_chain.net_weight, 160);
    }

    // Second refresh fails: warning set, displayed table unchanged, loop alive.
    let view_before = state.read().await.last_view.clone();
    refresh_tx.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let s = state.read().await;
        assert_eq!(s.polls, 2);
        assert_eq!(s.failures, 1);
        assert!(s.last_error.is_some());
        assert_eq!(s.last_view, view_before);
        assert!(s.last_snapshot.is_some());
    }

    // The independent persist timer writes the last good snapshot once.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    stop_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("poller must exit on stop signal")
        .unwrap()
        .unwrap();

    let persisted = sink.snapshots.lock().unwrap();
    assert_eq!(persisted.len(), 1, "same snapshot never persisted twice");
    assert_eq!(persisted[0].rows.len(), 2);
}

#[tokio::test]
async fn failed_sink_never_duplicates_rows_in_healthy_sink() {
    let source = ScriptedSource::new(vec![Ok(RawOptionChain::from_json(PAYLOAD).unwrap())]);
    let state = Arc::new(RwLock::new(DashboardState::default()));
    let healthy = SharedSink::default();
    let flaky_store = Arc::new(Mutex::new(Vec::new()));
    let flaky = FlakySink {
        failures_left: 1,
        snapshots: flaky_store.clone(),
    };
    let poller = Poller::new(
        source,
        manual_config(),
        state,
        vec![Box::new(healthy.clone()), Box::new(flaky)],
    );

    let (refresh_tx, refresh_rx) = mpsc::channel(4);
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(poller.run(refresh_rx, stop_rx));

    refresh_tx.send(()).await.unwrap();
    // Two persist ticks: the first fails on the flaky sink and lands in the
    // healthy one; the second retries the flaky sink only.
    tokio::time::sleep(Duration::from_millis(2400)).await;
    stop_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("poller must exit on stop signal")
        .unwrap()
        .unwrap();

    let healthy_rows = healthy.snapshots.lock().unwrap();
    let flaky_rows = flaky_store.lock().unwrap();
    assert_eq!(healthy_rows.len(), 1, "retry must not re-append elsewhere");
    assert_eq!(flaky_rows.len(), 1, "failed sink catches up on retry");
    assert_eq!(healthy_rows[0].timestamp, flaky_rows[0].timestamp);
}

#[tokio::test]
async fn dropped_stop_sender_terminates_loop() {
    let source = ScriptedSource::new(vec![]);
    let state = Arc::new(RwLock::new(DashboardState::default()));
    let poller = Poller::new(source, manual_config(), state, vec![]);

    let (_refresh_tx, refresh_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(poller.run(refresh_rx, stop_rx));

    drop(stop_tx);
    timeout(Duration::from_secs(2), task)
        .await
        .expect("loop must exit when the stop sender is gone")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn stop_signal_is_the_only_exit() {
    let source = ScriptedSource::new(vec![]);
    let state = Arc::new(RwLock::new(DashboardState::default()));
    let poller = Poller::new(source, manual_config(), state, vec![]);

    let (_refresh_tx, refresh_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(poller.run(refresh_rx, stop_rx));

    // Nothing scheduled fires; the loop idles until told to stop.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!task.is_finished());

    stop_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("poller must exit on stop signal")
        .unwrap()
        .unwrap();
}
