use crate::auction::{AuctionView, BidTracker};
use crate::infrastructure::{BackoffMode, ClockSync, CountdownTicker, ReconnectTimer, TaskManager};
use crate::messaging::AuctionNotification;
use std::sync::Weak;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

/// Consolidated mutable state for AuctionClient
/// Using a single struct keeps every event handler on one lock
pub struct ClientState {
    /// Local projection of the auction
    pub view: AuctionView,

    /// Server clock offset estimate
    pub clock: ClockSync,

    /// The bid waiting for its `bid_result`
    pub bids: BidTracker,

    /// Consecutive failed reconnect attempts
    pub reconnect: ReconnectTimer,

    /// Timestamp of the unanswered heartbeat, if any
    pub pending_heartbeat: Option<i64>,

    /// Set on every connect until the first full state arrives
    pub awaiting_initial_state: bool,

    /// Set by teardown; stops a racing reconnect from attaching
    pub torn_down: bool,

    /// Heartbeat and load-timeout tasks of the live connection
    pub connection_tasks: TaskManager,

    /// Task owning the live transport
    pub reader: Option<JoinHandle<()>>,

    /// Countdown task and the lot it counts down
    pub countdown: Option<(String, JoinHandle<()>)>,

    listeners: Vec<mpsc::Sender<AuctionNotification>>,
}

impl ClientState {
    pub fn new(backoff: BackoffMode, max_reconnect_attempts: u32) -> Self {
        Self {
            view: AuctionView::default(),
            clock: ClockSync::default(),
            bids: BidTracker::default(),
            reconnect: ReconnectTimer::new(backoff, max_reconnect_attempts),
            pending_heartbeat: None,
            awaiting_initial_state: false,
            torn_down: false,
            connection_tasks: TaskManager::new(),
            reader: None,
            countdown: None,
            listeners: Vec::new(),
        }
    }

    /// Registers a new notification listener
    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<AuctionNotification> {
        let (tx, rx) = mpsc::channel(capacity);
        self.listeners.push(tx);
        rx
    }

    /// Delivers a notification to every listener without blocking.
    /// A full listener misses it; a closed one is removed.
    pub fn notify(&mut self, notification: AuctionNotification) {
        self.listeners
            .retain(|tx| match tx.try_send(notification.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(dropped)) => {
                    tracing::warn!("Notification listener is full, dropping {:?}", dropped);
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
    }

    /// Starts, keeps or stops the countdown to match the current lot
    pub fn sync_countdown(&mut self, state: Weak<RwLock<ClientState>>) {
        let target = self
            .view
            .current_lot
            .as_ref()
            .filter(|lot| lot.is_biddable() && lot.timer_ends_at.is_some())
            .map(|lot| lot.id.clone());

        let already_running = self.countdown.as_ref().is_some_and(|(running, handle)| {
            Some(running) == target.as_ref() && !handle.is_finished()
        });
        if already_running {
            return;
        }

        self.stop_countdown();
        if let Some(lot_id) = target {
            tracing::debug!("Starting countdown for lot {}", lot_id);
            let handle = tokio::spawn(CountdownTicker::new(state, lot_id.clone()).run());
            self.countdown = Some((lot_id, handle));
        }
    }

    pub fn stop_countdown(&mut self) {
        if let Some((_, handle)) = self.countdown.take() {
            handle.abort();
        }
    }
}

impl Drop for ClientState {
    fn drop(&mut self) {
        self.stop_countdown();
    }
}
