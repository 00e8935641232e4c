//! Task spawning abstraction.
//!
//! Ring cycles run detached from the HTTP request that triggered them. The
//! [`TaskSpawner`] trait lets handlers start that work without knowing the
//! runtime, and [`TokioSpawner`] supervises each task so a panic is logged
//! instead of disappearing with the task.

use std::future::Future;

/// Abstraction for spawning background tasks.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    ///
    /// The task runs independently of the caller and will continue until
    /// completion. `name` identifies the task in logs.
    fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner.
///
/// Each task is paired with a watcher that awaits its `JoinHandle` and logs
/// a panic or cancellation.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = self.handle.spawn(future);
        self.handle.spawn(async move {
            if let Err(e) = task.await {
                if e.is_panic() {
                    log::error!("[Server] Background task '{}' panicked: {}", name, e);
                } else {
                    log::warn!("[Server] Background task '{}' was cancelled", name);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn tokio_spawner_executes_task() {
        let spawner = TokioSpawner::current();
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        spawner.spawn("test", async move {
            executed_clone.store(true, Ordering::SeqCst);
        });

        // Give the task time to execute
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(executed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_task_does_not_take_down_the_runtime() {
        let spawner = TokioSpawner::current();
        spawner.spawn("boom", async {
            panic!("ring task failure");
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();
        spawner.spawn("after", async move {
            executed_clone.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(executed.load(Ordering::SeqCst));
    }
}
