use std::{future::Future, sync::Arc};
use tokio::sync::{AcquireError, Semaphore};

/// Bounded concurrency limiter: at most `permits` tasks run at once, the
/// rest wait in FIFO order (tokio's Semaphore is fair). One limiter is
/// shared across a whole pipeline instance so the total number of in-flight
/// image operations stays bounded regardless of upstream fan-out.
#[derive(Clone)]
pub struct TaskLimiter {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

impl TaskLimiter {
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        TaskLimiter {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        }
    }

    pub fn capacity(&self) -> usize {
        self.permits
    }

    /// Waits for a permit, then runs the future. The permit is released
    /// when the future completes, immediately admitting the next waiter.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, AcquireError>
    where
        F: Future<Output = T>,
    {
        let _permit = self.semaphore.acquire().await?;
        Ok(fut.await)
    }
}
