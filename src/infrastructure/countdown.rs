use super::now_millis;
use crate::client::ClientState;
use crate::messaging::AuctionNotification;
use crate::types::COUNTDOWN_TICK;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time;

/// Display countdown for one lot.
///
/// Recomputes the remaining time from the lot's server deadline on every
/// tick, so a deadline extension or a new clock offset shows up on the next
/// tick. Stops after reporting zero, or as soon as its lot is no longer the
/// current biddable lot.
pub struct CountdownTicker {
    lot_id: String,
    tick: Duration,
    state: Weak<RwLock<ClientState>>,
}

impl CountdownTicker {
    pub fn new(state: Weak<RwLock<ClientState>>, lot_id: impl Into<String>) -> Self {
        Self {
            lot_id: lot_id.into(),
            tick: Duration::from_millis(COUNTDOWN_TICK),
            state,
        }
    }

    pub async fn run(self) {
        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(state) = self.state.upgrade() else {
                break;
            };
            let mut state = state.write().await;

            let deadline = state
                .view
                .current_lot
                .as_ref()
                .filter(|lot| lot.id == self.lot_id && lot.is_biddable())
                .and_then(|lot| lot.timer_ends_at);
            let Some(deadline) = deadline else {
                tracing::debug!("Countdown for lot {} is stale, stopping", self.lot_id);
                break;
            };

            let remaining_secs = state.clock.remaining_seconds(deadline, now_millis());
            state.notify(AuctionNotification::TimerTick {
                lot_id: self.lot_id.clone(),
                remaining_secs,
            });

            if remaining_secs == 0 {
                break;
            }
        }
    }
}
