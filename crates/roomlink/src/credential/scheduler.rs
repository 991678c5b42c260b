// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proactive renewal timing: one single-shot timer armed ahead of expiry.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Lead time before expiry for refresh-capable credentials.
pub const DELEGATED_RENEW_LEAD: Duration = Duration::from_secs(5 * 60);

/// Browser-assisted credentials cannot refresh themselves; re-extraction is
/// heavier, so it gets more margin.
pub const BROWSER_RENEW_LEAD: Duration = Duration::from_secs(15 * 60);

/// Single-shot renewal timer. Arming replaces any pending timer; disarming is
/// idempotent. Rearming after a successful renewal is the caller's job.
pub struct RenewalScheduler {
    slot: Mutex<Option<(u64, CancellationToken)>>,
    generation: AtomicU64,
}

impl RenewalScheduler {
    pub fn new() -> Self {
        Self { slot: Mutex::new(None), generation: AtomicU64::new(0) }
    }

    /// Delay until renewal should fire, or `None` when the credential never
    /// expires or is already inside the lead window (the caller must not arm
    /// and will reacquire explicitly instead).
    pub fn renew_delay(expires_at: u64, lead: Duration) -> Option<Duration> {
        if expires_at == 0 {
            return None;
        }
        let renew_at = expires_at.saturating_sub(lead.as_secs());
        let now = crate::credential::epoch_secs();
        (renew_at > now).then(|| Duration::from_secs(renew_at - now))
    }

    /// Arm the timer: `task` runs once after `delay` unless disarmed or
    /// replaced first.
    pub fn arm<F, Fut>(self: &Arc<Self>, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut slot = self.slot.lock();
            if let Some((_, old)) = slot.take() {
                old.cancel();
            }
            *slot = Some((generation, token.clone()));
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => return,
            }

            // The timer is consumed once it fires; success paths rearm.
            {
                let mut slot = scheduler.slot.lock();
                if slot.as_ref().map(|(g, _)| *g) == Some(generation) {
                    *slot = None;
                }
            }
            task().await;
        });
    }

    /// Cancel any pending timer.
    pub fn disarm(&self) {
        if let Some((_, token)) = self.slot.lock().take() {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl Default for RenewalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
