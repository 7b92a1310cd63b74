//! Autosave write throttle
//!
//! The first edit arms a deadline `delay_ms` out; later edits before the
//! deadline only replace the pending snapshot. When the deadline passes the
//! latest snapshot is handed out exactly once, so a burst of keystrokes
//! becomes a single write holding all of them.

use crate::models::FieldValues;

#[derive(Debug, Clone)]
struct Pending {
    due_at: i64,
    snapshot: FieldValues,
}

/// Coalesces bursts of field edits into one write
#[derive(Debug, Clone)]
pub struct WriteThrottle {
    delay_ms: i64,
    pending: Option<Pending>,
}

impl WriteThrottle {
    /// Create a throttle that fires `delay_ms` after the first edit of a burst
    pub fn new(delay_ms: i64) -> Self {
        Self {
            delay_ms: delay_ms.max(0),
            pending: None,
        }
    }

    /// Record the latest full snapshot
    pub fn schedule(&mut self, snapshot: FieldValues, now_ms: i64) {
        match self.pending.as_mut() {
            Some(pending) => pending.snapshot = snapshot,
            None => {
                self.pending = Some(Pending {
                    due_at: now_ms.saturating_add(self.delay_ms),
                    snapshot,
                })
            }
        }
    }

    /// Take the pending snapshot if its deadline has passed
    pub fn take_due(&mut self, now_ms: i64) -> Option<FieldValues> {
        match &self.pending {
            Some(pending) if now_ms >= pending.due_at => self.pending.take().map(|p| p.snapshot),
            _ => None,
        }
    }

    /// Drop whatever is pending, returning it
    pub fn cancel(&mut self) -> Option<FieldValues> {
        self.pending.take().map(|p| p.snapshot)
    }

    /// Whether a write is waiting
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
