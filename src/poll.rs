// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic polling for channels without push notifications.
//!
//! Some channels never produce push notifications; their handlers fall back
//! to periodic on-demand reads. The [`PollScheduler`] runs those reads as
//! background tasks on the shared tokio runtime and hands out cancellable
//! [`PollHandle`]s.
//!
//! Cancellation is non-blocking: it stops future runs without waiting for
//! an in-flight run to finish, and a run never starts after `cancel` has
//! returned.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

/// Shared cancellation state between a handle and its task.
#[derive(Debug, Default)]
struct PollShared {
    cancelled: AtomicBool,
    notify: Notify,
}

impl PollShared {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cancellable handle to one scheduled poll task.
///
/// Dropping the handle does not cancel the task; call
/// [`cancel`](Self::cancel) explicitly, or cancel everything through
/// [`PollScheduler::cancel_all`].
#[derive(Debug, Clone)]
pub struct PollHandle {
    shared: Arc<PollShared>,
}

impl PollHandle {
    /// Stops future executions of the task.
    ///
    /// Safe to call more than once and safe to call while a run is in
    /// flight: the in-flight run completes, but no further run starts after
    /// this returns.
    pub fn cancel(&self) {
        if !self.shared.cancelled.swap(true, Ordering::AcqRel) {
            self.shared.notify.notify_one();
        }
    }

    /// Returns `true` if the task has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

/// Shared scheduling facility for periodic poll tasks.
///
/// Cloning yields another reference to the same facility.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use modbridge::poll::PollScheduler;
///
/// # async fn example() {
/// let scheduler = PollScheduler::new();
/// let handle = scheduler.schedule(Duration::from_secs(30), || async {
///     // read and publish a channel value
/// });
///
/// // Later, on teardown:
/// handle.cancel();
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PollScheduler {
    tasks: Arc<Mutex<Vec<Weak<PollShared>>>>,
}

impl PollScheduler {
    /// Creates a new scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a task to run once per interval.
    ///
    /// The first run happens one full interval after scheduling. A run that
    /// overshoots its interval delays the next run rather than stacking up.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn schedule<F, Fut>(&self, interval: Duration, task: F) -> PollHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let shared = Arc::new(PollShared::default());
        self.track(&shared);

        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of tokio's interval fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if task_shared.is_cancelled() {
                            break;
                        }
                        task().await;
                    }
                    () = task_shared.notify.notified() => break,
                }
            }
            tracing::debug!("poll task stopped");
        });

        PollHandle { shared }
    }

    /// Cancels every task scheduled through this facility.
    pub fn cancel_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for weak in tasks {
            if let Some(shared) = weak.upgrade() {
                PollHandle { shared }.cancel();
            }
        }
    }

    /// Returns the number of tasks that are still live.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|weak| weak.upgrade().is_some_and(|s| !s.is_cancelled()));
        tasks.len()
    }

    fn track(&self, shared: &Arc<PollShared>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|weak| weak.strong_count() > 0);
        tasks.push(Arc::downgrade(shared));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test(start_paused = true)]
    async fn first_run_after_one_interval() {
        let scheduler = PollScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        let _handle = scheduler.schedule(Duration::from_secs(30), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_repeat_per_interval() {
        let scheduler = PollScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        let _handle = scheduler.schedule(Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_future_runs() {
        let scheduler = PollScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        let handle = scheduler.schedule(Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        handle.cancel();
        assert!(handle.is_cancelled());
        // Double cancel is a no-op.
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_run() {
        let scheduler = PollScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        let handle = scheduler.schedule(Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_every_task() {
        let scheduler = PollScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&runs);
            let _handle = scheduler.schedule(Duration::from_secs(10), move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        assert_eq!(scheduler.active_count(), 3);

        scheduler.cancel_all();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.active_count(), 0);
    }
}
