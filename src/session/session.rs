use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::errors::SessionError;
use super::shared::SessionShared;
use super::training_loop::{self, Trainer};
use super::types::{SessionState, SessionStatus, SubscriberId};
use crate::config::TrainingConfig;
use crate::runtime::{CancelSignal, Scheduler, TaskHandle};
use crate::transport::Subscriber;

struct SessionInner {
    /// Present whenever no loop task owns it.
    trainer: Option<Trainer>,
    task: Option<TaskHandle<Trainer>>,
}

/// One configuration with its own environment and solver.
///
/// Lifecycle operations serialise on an internal lock, so `start` and
/// `stop` never interleave for the same session.
pub struct Session {
    id: Uuid,
    config: TrainingConfig,
    created_at: Instant,
    shared: Arc<SessionShared>,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub(crate) fn new(id: Uuid, config: TrainingConfig, trainer: Trainer) -> Self {
        Self {
            id,
            config,
            created_at: Instant::now(),
            shared: Arc::new(SessionShared::new()),
            inner: Mutex::new(SessionInner {
                trainer: Some(trainer),
                task: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state();
        SessionStatus {
            session_id: self.id,
            state,
            is_running: state == SessionState::Running,
            current_episode: self.shared.current_episode(),
            total_episodes: self.config.n_episodes,
            elapsed_time: self.shared.elapsed().as_secs_f64(),
            config: self.config.clone(),
            last_error: self.shared.fault(),
        }
    }

    /// Spawns the training loop. A running session is left alone; a
    /// completed or errored one is rejected.
    pub async fn start<S: Scheduler>(&self, scheduler: &S) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let state = self.state();
        match state {
            SessionState::Running => return Ok(()),
            SessionState::Completed | SessionState::Errored => {
                return Err(SessionError::NotResumable { id: self.id, state });
            }
            SessionState::Created | SessionState::Stopped => {}
        }
        let Some(trainer) = inner.trainer.take() else {
            return Err(SessionError::NotResumable { id: self.id, state });
        };

        self.shared.mark_running();
        let id = self.id;
        let shared = Arc::clone(&self.shared);
        let delay = self.config.step_delay();
        let handle = scheduler.submit(move |cancel: CancelSignal| {
            training_loop::run(id, trainer, shared, delay, cancel)
        });
        inner.task = Some(handle);

        info!(
            session_id = %self.id,
            algorithm = %self.config.algorithm,
            environment = %self.config.environment,
            resumed = state == SessionState::Stopped,
            "training started"
        );
        Ok(())
    }

    /// Cancels the loop and waits for it to exit. The session has left
    /// `Running` when this returns; stopping an idle session does nothing.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let Some(task) = inner.task.take() else {
            return Ok(());
        };
        match task.cancel().await {
            Ok(trainer) => {
                inner.trainer = Some(trainer);
                Ok(())
            }
            Err(err) => {
                let err = SessionError::from(err);
                self.shared.record_fault(&err);
                self.shared.detach_any();
                self.shared.finish(SessionState::Errored);
                Err(err)
            }
        }
    }

    pub fn attach(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = self.shared.attach(subscriber);
        info!(session_id = %self.id, "subscriber attached");
        id
    }

    pub fn detach(&self, id: SubscriberId) -> bool {
        let detached = self.shared.detach(id);
        if detached {
            info!(session_id = %self.id, "subscriber detached");
        }
        detached
    }

    pub fn has_subscriber(&self) -> bool {
        self.shared.has_subscriber()
    }
}
