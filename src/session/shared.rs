use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::errors::SessionError;
use super::types::{SessionState, SubscriberId};
use crate::transport::{StreamMessage, Subscriber, TransportError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Clock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

struct Attached {
    id: SubscriberId,
    subscriber: Arc<dyn Subscriber>,
}

/// Session state read by both the owner and the training loop.
pub(crate) struct SessionShared {
    state: Mutex<SessionState>,
    current_episode: AtomicUsize,
    clock: Mutex<Clock>,
    subscriber: Mutex<Option<Attached>>,
    next_subscriber: AtomicU64,
    fault: Mutex<Option<String>>,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Created),
            current_episode: AtomicUsize::new(0),
            clock: Mutex::new(Clock::default()),
            subscriber: Mutex::new(None),
            next_subscriber: AtomicU64::new(1),
            fault: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub(crate) fn mark_running(&self) {
        *lock(&self.state) = SessionState::Running;
        let mut clock = lock(&self.clock);
        if clock.running_since.is_none() {
            clock.running_since = Some(Instant::now());
        }
    }

    /// Leaves `Running` for `state` and freezes the clock.
    pub(crate) fn finish(&self, state: SessionState) {
        *lock(&self.state) = state;
        let mut clock = lock(&self.clock);
        if let Some(since) = clock.running_since.take() {
            clock.accumulated += since.elapsed();
        }
    }

    /// Records why the session ended up `Errored`.
    pub(crate) fn record_fault(&self, err: &SessionError) {
        *lock(&self.fault) = Some(err.to_string());
    }

    pub(crate) fn fault(&self) -> Option<String> {
        lock(&self.fault).clone()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        let clock = lock(&self.clock);
        clock.accumulated + clock.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }

    pub(crate) fn current_episode(&self) -> usize {
        self.current_episode.load(Ordering::Acquire)
    }

    pub(crate) fn observe_episode(&self, episode: usize) {
        self.current_episode.fetch_max(episode, Ordering::AcqRel);
    }

    /// Replaces any previous subscriber.
    pub(crate) fn attach(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        let previous = lock(&self.subscriber).replace(Attached { id, subscriber });
        if let Some(previous) = previous {
            tracing::debug!(replaced = previous.id.0, "subscriber replaced");
        }
        id
    }

    /// Detaches `id` if it is still the current subscriber.
    pub(crate) fn detach(&self, id: SubscriberId) -> bool {
        let mut current = lock(&self.subscriber);
        if current.as_ref().is_some_and(|attached| attached.id == id) {
            *current = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn detach_any(&self) {
        lock(&self.subscriber).take();
    }

    pub(crate) fn has_subscriber(&self) -> bool {
        lock(&self.subscriber).is_some()
    }

    /// Sends to the current subscriber. Without one the message is dropped.
    pub(crate) async fn deliver(&self, message: StreamMessage) -> Result<(), TransportError> {
        let subscriber = lock(&self.subscriber)
            .as_ref()
            .map(|attached| Arc::clone(&attached.subscriber));
        match subscriber {
            Some(subscriber) => subscriber.deliver(message).await,
            None => Ok(()),
        }
    }
}
