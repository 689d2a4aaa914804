//! A software timer wheel driven by `tokio::time`, the only component that
//! actually calls `tokio::time::sleep_until` (spec.md §5, SPEC_FULL.md §5).
//!
//! Modeled on `powerlink-rs::sdo::client_manager::SdoClientManager`'s
//! deadline-scan idiom (`next_action_time` returning the soonest deadline
//! across all live transactions), adapted from a `u64` microsecond timestamp
//! to `tokio::time::Instant` and from "one deadline per connection" to "one
//! deadline per armed `TimerHandle`", since the core arms many independent
//! timers (one per UE release, one per staged handover, one per ESM
//! transaction) rather than one per peer connection.

use mme_s1ap_core::TimerHandle;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

/// Pending timer entries ordered by deadline. Handles are never reused (the
/// core hands out a fresh one from a monotonic counter on every arm), so a
/// cancelled handle can simply be remembered and skipped when its entry
/// eventually reaches the front of the heap rather than searched for and
/// removed up front.
#[derive(Debug, Default)]
pub struct TimerWheel {
    heap: BinaryHeap<Reverse<(Instant, TimerHandle)>>,
    cancelled: HashSet<TimerHandle>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a new one-shot timer (`EngineAction::ArmTimer`).
    pub fn arm(&mut self, handle: TimerHandle, duration: Duration) {
        self.heap.push(Reverse((Instant::now() + duration, handle)));
    }

    /// Cancels a previously armed timer (`EngineAction::CancelTimer`). A
    /// no-op if the handle already fired or was never armed.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.cancelled.insert(handle);
    }

    /// Waits for the next timer that is both due and not cancelled, and
    /// returns its handle. Never resolves while the wheel is empty, so
    /// callers drive this from within a `tokio::select!` alongside other
    /// branches rather than awaiting it alone.
    pub async fn next_expired(&mut self) -> TimerHandle {
        loop {
            let Some(&Reverse((deadline, handle))) = self.heap.peek() else {
                std::future::pending::<()>().await;
                unreachable!("pending future never resolves");
            };
            if self.cancelled.remove(&handle) {
                self.heap.pop();
                continue;
            }
            tokio::time::sleep_until(deadline).await;
            self.heap.pop();
            return handle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_in_deadline_order() {
        let mut wheel = TimerWheel::new();
        wheel.arm(2, Duration::from_millis(20));
        wheel.arm(1, Duration::from_millis(10));

        assert_eq!(wheel.next_expired().await, 1);
        assert_eq!(wheel.next_expired().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_is_skipped() {
        let mut wheel = TimerWheel::new();
        wheel.arm(1, Duration::from_millis(10));
        wheel.arm(2, Duration::from_millis(20));
        wheel.cancel(1);

        assert_eq!(wheel.next_expired().await, 2);
    }
}
