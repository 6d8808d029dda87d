use tokio::sync::watch;
use uuid::Uuid;

use crate::runtime::handle::TaskHandle;
use crate::runtime::task::{CancelSignal, Task};

pub trait Scheduler: Send + Sync {
    fn submit<T>(&self, task: T) -> TaskHandle<T::Output>
    where
        T: Task + 'static;
}

/// Runs every task on the ambient tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct LocalScheduler {}

impl LocalScheduler {
    pub fn new() -> Self {
        Self {}
    }
}

impl Scheduler for LocalScheduler {
    fn submit<T>(&self, task: T) -> TaskHandle<T::Output>
    where
        T: Task + 'static,
    {
        let task_id = Uuid::new_v4();
        let (cancel, receiver) = watch::channel(false);
        let future = task.call(CancelSignal::new(receiver));

        tracing::trace!(%task_id, "spawning task");
        let join = tokio::spawn(future);
        TaskHandle::new(task_id, cancel, join)
    }
}
