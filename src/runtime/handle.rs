use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::runtime::error::Error;

/// Owner's side of a spawned task: its id, its cancellation switch and its
/// eventual output. Awaiting the handle waits for the output.
pub struct TaskHandle<T> {
    id: Uuid,
    cancel: watch::Sender<bool>,
    join: JoinHandle<T>,
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("finished", &self.join.is_finished())
            .field("result_type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: Uuid, cancel: watch::Sender<bool>, join: JoinHandle<T>) -> Self {
        Self { id, cancel, join }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Raises the cancellation signal without waiting.
    pub fn request_cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Raises the cancellation signal and waits until the task has actually
    /// returned.
    pub async fn cancel(self) -> Result<T, Error> {
        self.request_cancel();
        self.await
    }

    /// Stops the task at its next suspension point without waiting.
    pub fn abort(&self) {
        self.join.abort();
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join).poll(cx).map(|result| result.map_err(Error::from))
    }
}
