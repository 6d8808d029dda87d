use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// A unit of long-running work. The scheduler hands every task the
/// receiving side of its cancellation signal.
pub trait Task: Send {
    type Output: Send + 'static;
    type Future: Future<Output = Self::Output> + Send + 'static;

    fn call(self, cancel: CancelSignal) -> Self::Future;
}

/// Closures returning a future are tasks.
impl<F, Fut> Task for F
where
    F: FnOnce(CancelSignal) -> Fut + Send,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    type Output = Fut::Output;
    type Future = Fut;

    fn call(self, cancel: CancelSignal) -> Self::Future {
        self(cancel)
    }
}

/// Cooperative cancellation flag observed by a running task.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    pub(crate) fn new(receiver: watch::Receiver<bool>) -> Self {
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested. A dropped handle counts as
    /// a request.
    pub async fn cancelled(&mut self) {
        let _ = self.receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleeps for `duration` unless cancelled first. Returns `false` when
    /// the sleep was cut short.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}
