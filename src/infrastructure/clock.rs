use crate::types::OFFSET_DEADBAND_MS;

/// Current client wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whole seconds left before `deadline_ms`, as seen on the server clock.
///
/// Never negative: a deadline in the past reads as zero.
pub fn remaining_seconds(deadline_ms: i64, client_now_ms: i64, offset_ms: i64) -> u64 {
    let remaining = deadline_ms.saturating_sub(client_now_ms.saturating_add(offset_ms));
    if remaining <= 0 {
        0
    } else {
        (remaining / 1000) as u64
    }
}

/// Estimated skew between the server clock and ours (`server - client`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockSync {
    offset_ms: i64,
}

impl ClockSync {
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Feeds a heartbeat acknowledgment. The estimate is only committed when it
    /// moves more than the deadband away from the current one. Returns true
    /// when the offset changed.
    pub fn observe(&mut self, server_time_ms: i64, client_time_ms: i64) -> bool {
        let estimate = server_time_ms.saturating_sub(client_time_ms);
        if estimate.abs_diff(self.offset_ms) > OFFSET_DEADBAND_MS.unsigned_abs() {
            self.offset_ms = estimate;
            true
        } else {
            false
        }
    }

    /// Commits a fresh estimate unconditionally (after a snapshot)
    pub fn recalibrate(&mut self, server_time_ms: i64, client_time_ms: i64) {
        self.offset_ms = server_time_ms.saturating_sub(client_time_ms);
    }

    pub fn remaining_seconds(&self, deadline_ms: i64, client_now_ms: i64) -> u64 {
        remaining_seconds(deadline_ms, client_now_ms, self.offset_ms)
    }
}
