//! Periodic liveness ticks with deterministic cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use sketchdock_core::liveness::LIVENESS_CHECK_INTERVAL_MS;
use sketchdock_panel::PanelManager;

/// The single manager instance, shared between host callbacks and the
/// ticker task.
pub type SharedManager = Arc<Mutex<PanelManager>>;

type TickFn = Box<dyn FnMut(DateTime<Utc>) + Send>;

/// Drives the connection-liveness check on a fixed interval.
///
/// The task holds a cancellation token rather than being abandoned:
/// `stop` cancels it and waits for the loop to exit, and dropping the
/// ticker cancels it without waiting. Either way no tick can fire after
/// teardown.
pub struct LivenessTicker {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LivenessTicker {
    /// Spawn the ticker against the shared manager at the standard
    /// check interval.
    pub fn spawn(manager: SharedManager) -> Self {
        Self::with_interval(
            Duration::from_millis(LIVENESS_CHECK_INTERVAL_MS),
            Box::new(move |now| {
                if let Ok(mut manager) = manager.lock() {
                    manager.run_liveness_check(now);
                }
            }),
        )
    }

    /// Spawn with an explicit period and tick action.
    pub fn with_interval(period: Duration, mut tick: TickFn) -> Self {
        let cancel = CancellationToken::new();
        let watch = cancel.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately;
            // consume it so checks start one period after spawn.
            interval.tick().await;
            loop {
                tokio::select! {
                    // Cancellation wins over a due tick.
                    biased;
                    _ = watch.cancelled() => break,
                    _ = interval.tick() => tick(Utc::now()),
                }
            }
            tracing::debug!("liveness ticker stopped");
        });
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Cancel the ticker and wait for the loop to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("liveness ticker task failed: {e}");
            }
        }
    }
}

impl Drop for LivenessTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_tick(counter: Arc<AtomicU32>) -> TickFn {
        Box::new(move |_now| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fire_once_per_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let ticker = LivenessTicker::with_interval(
            Duration::from_secs(5),
            counting_tick(Arc::clone(&counter)),
        );

        // Let the task start and register its interval before advancing.
        tokio::task::yield_now().await;
        // Advance one period at a time: the interval skips missed
        // ticks, so a single large jump would coalesce into one.
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(5)).await;
            tokio::task::yield_now().await;
        }

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let counter = Arc::new(AtomicU32::new(0));
        let ticker = LivenessTicker::with_interval(
            Duration::from_secs(5),
            counting_tick(Arc::clone(&counter)),
        );

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        ticker.stop().await;
        let seen = counter.load(Ordering::SeqCst);

        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_the_task() {
        let counter = Arc::new(AtomicU32::new(0));
        let ticker = LivenessTicker::with_interval(
            Duration::from_secs(5),
            counting_tick(Arc::clone(&counter)),
        );
        drop(ticker);

        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_resolves_promptly() {
        let ticker = LivenessTicker::with_interval(
            Duration::from_secs(3600),
            Box::new(|_| {}),
        );
        tokio::time::timeout(Duration::from_secs(2), ticker.stop())
            .await
            .expect("stop should not hang");
    }
}
