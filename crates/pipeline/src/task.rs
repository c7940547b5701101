//! Restartable background task with idempotent stop

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of one monitor loop
///
/// The loop receives a [`CancellationToken`] and is expected to return
/// promptly once it fires. Loops that ignore it are aborted after the stop
/// timeout.
pub struct MonitorTask {
    name: &'static str,
    running: Mutex<Option<Running>>,
    stop_timeout: Duration,
}

impl MonitorTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Mutex::new(None),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Spawn the loop unless one is already running
    ///
    /// Returns false when the monitor was already active.
    pub fn spawn<F, Fut>(&self, body: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                tracing::debug!(monitor = self.name, "Monitor already running");
                return false;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(body(cancel.clone()));
        *running = Some(Running { cancel, handle });
        tracing::debug!(monitor = self.name, "Monitor started");
        true
    }

    /// Cancel the loop and wait for it to finish
    ///
    /// Never panics, also when the loop itself panicked. Returns false when
    /// nothing was running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running.lock().take() else {
            return false;
        };

        running.cancel.cancel();
        let mut handle = running.handle;
        match tokio::time::timeout(self.stop_timeout, &mut handle).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) if e.is_panic() => {
                tracing::warn!(monitor = self.name, "Monitor loop panicked");
            }
            Ok(Err(_)) => {},
            Err(_) => {
                tracing::warn!(
                    monitor = self.name,
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "Monitor loop ignored cancellation, aborting"
                );
                handle.abort();
            }
        }
        tracing::debug!(monitor = self.name, "Monitor stopped");
        true
    }

    pub fn is_active(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for MonitorTask {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
            running.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stop_when_not_started() {
        let task = MonitorTask::new("test");
        assert!(!task.stop().await);
        assert!(!task.stop().await);
        assert!(!task.is_active());
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let task = MonitorTask::new("test");
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = runs.clone();
            assert!(task.spawn(move |cancel| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                cancel.cancelled().await;
            }));
            tokio::task::yield_now().await;
            assert!(task.is_active());
            assert!(task.stop().await);
            assert!(!task.is_active());
        }

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_second_spawn_is_ignored_while_running() {
        let task = MonitorTask::new("test");
        assert!(task.spawn(|cancel| async move { cancel.cancelled().await }));
        assert!(!task.spawn(|cancel| async move { cancel.cancelled().await }));
        task.stop().await;
    }

    #[tokio::test]
    async fn test_finished_loop_is_inactive_and_restartable() {
        let task = MonitorTask::new("test");
        task.spawn(|_| async {});
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_active());
        assert!(task.spawn(|cancel| async move { cancel.cancelled().await }));
        assert!(task.is_active());
        task.stop().await;
    }

    #[tokio::test]
    async fn test_stop_survives_panicking_loop() {
        let task = MonitorTask::new("test");
        task.spawn(|_| async { panic!("device exploded") });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(task.stop().await);
        assert!(!task.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncooperative_loop_is_aborted() {
        let task = MonitorTask::new("test").with_stop_timeout(Duration::from_millis(100));
        task.spawn(|_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        assert!(task.stop().await);
        assert!(!task.is_active());
    }
}
