use std::time::Duration;

use tokio::runtime::Handle;

use crate::domain::ports::{RestartScheduler, RestartTask};

/// Runs restarts on the tokio timer, then on the blocking pool since
/// `Connection::start` performs blocking open/handshake I/O.
pub struct TokioRestartScheduler {
    handle: Handle,
}

impl TokioRestartScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime of the calling context
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl RestartScheduler for TokioRestartScheduler {
    fn schedule(&self, delay: Duration, task: RestartTask) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tokio::task::spawn_blocking(task).await {
                tracing::error!("Restart task panicked: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_task_runs_after_delay() {
        let scheduler = TokioRestartScheduler::current();
        let runs = Arc::new(AtomicU32::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel();
        let started = Instant::now();

        {
            let runs = Arc::clone(&runs);
            scheduler.schedule(
                Duration::from_millis(50),
                Box::new(move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(started.elapsed());
                }),
            );
        }

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        let elapsed = rx.await.unwrap();
        assert!(elapsed >= Duration::from_millis(50));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_schedule_from_blocking_thread() {
        let scheduler = Arc::new(TokioRestartScheduler::current());
        let (tx, rx) = tokio::sync::oneshot::channel();

        let from_thread = Arc::clone(&scheduler);
        std::thread::spawn(move || {
            from_thread.schedule(
                Duration::from_millis(10),
                Box::new(move || {
                    let _ = tx.send(());
                }),
            );
        })
        .join()
        .unwrap();

        assert!(rx.await.is_ok());
    }
}
