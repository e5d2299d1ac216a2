//! Single-flight gate for outbound frame pushes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Allows at most one guarded operation in flight at a time.
///
/// Clones share the same gate. The `try_*` methods never wait: when an
/// operation is already running they return `None` and the new one is
/// dropped, not queued.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    lock: Arc<Mutex<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Run `op` now if the gate is free, otherwise skip it.
    pub fn try_run<R>(&self, op: impl FnOnce() -> R) -> Option<R> {
        let _held = self.lock.try_lock().ok()?;
        Some(op())
    }

    /// Wait for the gate, then run `op`.
    ///
    /// Blocks the current thread; must not be called from async code.
    pub fn run<R>(&self, op: impl FnOnce() -> R) -> R {
        let _held = self.lock.blocking_lock();
        op()
    }

    /// Wait for the gate asynchronously, then drive `fut` to completion.
    pub async fn run_async<F: Future>(&self, fut: F) -> F::Output {
        let _held = self.lock.lock().await;
        fut.await
    }

    /// Spawn `fut` on the runtime if the gate is free, otherwise skip it.
    ///
    /// The gate stays held until the spawned task finishes, so a slow
    /// operation keeps later ones out even after this call returns.
    pub fn try_spawn<F>(&self, fut: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let held = Arc::clone(&self.lock).try_lock_owned().ok()?;
        Some(tokio::spawn(async move {
            let output = fut.await;
            drop(held);
            output
        }))
    }
}
