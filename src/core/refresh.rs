use crate::core::market::compute_derived_variations;
use crate::domain::model::{DerivedVariations, MarketData};
use crate::domain::ports::MarketSource;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Overlapping refreshes all run; whichever completes last is shown.
    #[default]
    LastWriteWins,
    /// A trigger that arrives while a refresh is running is dropped.
    SingleFlight,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BoardStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Retryable. The previous data, if any, stays on the board.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BoardSnapshot {
    pub data: Option<MarketData>,
    pub variations: Option<DerivedVariations>,
    pub status: BoardStatus,
    /// Number of refreshes applied so far.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// Another refresh was in flight under `SingleFlight`.
    Skipped,
    /// The board was closed before the result came back.
    Discarded,
}

#[derive(Debug, Default)]
struct BoardState {
    snapshot: BoardSnapshot,
    closed: bool,
}

/// Shared display state for the market dashboard.
#[derive(Debug, Clone)]
pub struct MarketBoard {
    state: Arc<RwLock<BoardState>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for MarketBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(BoardState::default())),
            changes: Arc::new(tx),
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.read().snapshot.clone()
    }

    /// Notified with the new generation whenever a refresh is applied.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Stops accepting results. Refreshes still in flight are discarded.
    pub fn close(&self) {
        self.write().closed = true;
    }

    fn begin(&self) -> bool {
        let mut state = self.write();
        if state.closed {
            return false;
        }
        state.snapshot.status = BoardStatus::Loading;
        true
    }

    fn finish(&self, result: Result<MarketData>) -> Result<RefreshOutcome> {
        let mut state = self.write();
        if state.closed {
            return Ok(RefreshOutcome::Discarded);
        }

        match result {
            Ok(data) => {
                state.snapshot.variations = compute_derived_variations(&data.history).ok();
                state.snapshot.data = Some(data);
                state.snapshot.status = BoardStatus::Ready;
                state.snapshot.generation += 1;
                let generation = state.snapshot.generation;
                drop(state);
                self.changes.send_replace(generation);
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => {
                state.snapshot.status = BoardStatus::Failed {
                    message: e.user_friendly_message(),
                };
                Err(e)
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs market refreshes against a source and publishes them on a board.
pub struct MarketRefresher<S: MarketSource> {
    source: Arc<S>,
    board: MarketBoard,
    policy: RefreshPolicy,
    running: Arc<AtomicBool>,
}

/// Clears the single-flight flag even when the refresh future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: MarketSource> Clone for MarketRefresher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            board: self.board.clone(),
            policy: self.policy,
            running: Arc::clone(&self.running),
        }
    }
}

impl<S: MarketSource + 'static> MarketRefresher<S> {
    pub fn new(source: Arc<S>, board: MarketBoard, policy: RefreshPolicy) -> Self {
        Self {
            source,
            board,
            policy,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn board(&self) -> &MarketBoard {
        &self.board
    }

    /// One full refresh. Failures are recorded on the board and returned.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let _in_flight = match self.policy {
            RefreshPolicy::SingleFlight => {
                if self.running.swap(true, Ordering::AcqRel) {
                    tracing::debug!("Refresh already in flight, skipping trigger");
                    return Ok(RefreshOutcome::Skipped);
                }
                Some(InFlight(&self.running))
            }
            RefreshPolicy::LastWriteWins => None,
        };

        self.run_once().await
    }

    async fn run_once(&self) -> Result<RefreshOutcome> {
        if !self.board.begin() {
            return Ok(RefreshOutcome::Discarded);
        }

        let result = self.source.fetch().await;
        let outcome = self.board.finish(result);

        match &outcome {
            Ok(RefreshOutcome::Applied) => {
                tracing::debug!("📈 Market board refreshed");
            }
            Ok(RefreshOutcome::Discarded) => {
                tracing::debug!("Discarding market refresh that resolved after shutdown");
            }
            Ok(RefreshOutcome::Skipped) => {}
            Err(e) => {
                tracing::warn!("⚠️ Market refresh failed: {}", e);
            }
        }
        outcome
    }

    /// Refreshes once immediately, then every `interval` and on each manual
    /// trigger, until the handle is shut down.
    pub fn spawn(self, interval: Duration) -> RefresherHandle {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(8);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let board = self.board.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracing::debug!("⏰ Periodic market refresh");
                    }
                    Some(()) = trigger_rx.recv() => {
                        tracing::info!("🔄 Manual market refresh");
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }

                // Each refresh runs on its own task so a slow one never blocks
                // the next trigger.
                let refresher = self.clone();
                tokio::spawn(async move {
                    let _ = refresher.refresh().await;
                });
            }

            self.board.close();
            tracing::info!("Market refresher stopped");
        });

        RefresherHandle {
            trigger_tx,
            shutdown_tx,
            board,
            join,
        }
    }
}

pub struct RefresherHandle {
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    board: MarketBoard,
    join: JoinHandle<()>,
}

impl RefresherHandle {
    pub fn board(&self) -> &MarketBoard {
        &self.board
    }

    /// Manual refresh; also the retry action after a failure.
    pub fn trigger(&self) -> bool {
        self.trigger_tx.try_send(()).is_ok()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            tracing::error!("Market refresher task failed: {}", e);
        }
        self.board.close();
    }
}
