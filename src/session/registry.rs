use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use uuid::Uuid;

use super::errors::SessionError;
use super::session::Session;
use super::training_loop::Trainer;
use super::types::{SessionStatus, SubscriberId};
use crate::config::{ConfigError, ServiceConfig, TrainingConfig};
use crate::env::create_environment;
use crate::runtime::LocalScheduler;
use crate::solver::create_solver;
use crate::transport::Subscriber;

/// In-memory table of live sessions.
///
/// The registry is an ordinary value; whatever exposes the session
/// operations owns one, usually behind an `Arc`.
pub struct SessionRegistry {
    config: ServiceConfig,
    scheduler: LocalScheduler,
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            scheduler: LocalScheduler::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions().keys().copied().collect()
    }

    /// Validates `config`, builds the environment and solver, and registers
    /// the session. Expired idle sessions are evicted first; a full registry
    /// rejects the request.
    pub fn create(&self, config: TrainingConfig) -> Result<Uuid, SessionError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let env = create_environment(config.environment, &config.environment_options, seed)
            .map_err(|err| ConfigError::Environment(err.to_string()))?;
        let solver = create_solver(&config, env.as_ref(), seed)?;

        let id = Uuid::new_v4();
        let algorithm = config.algorithm;
        let environment = config.environment;
        let session = Arc::new(Session::new(id, config, Trainer { env, solver }));

        let mut sessions = self.sessions();
        self.evict_expired(&mut sessions);
        if sessions.len() >= self.config.max_sessions {
            return Err(SessionError::Capacity {
                max: self.config.max_sessions,
            });
        }
        sessions.insert(id, session);
        drop(sessions);

        info!(session_id = %id, %algorithm, %environment, "session created");
        Ok(id)
    }

    fn evict_expired(&self, sessions: &mut HashMap<Uuid, Arc<Session>>) {
        let ttl = self.config.session_ttl;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.is_running() || session.age() <= ttl;
            if !keep {
                debug!(session_id = %id, "evicting expired session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "expired sessions evicted");
        }
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        self.sessions()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn start(&self, id: Uuid) -> Result<(), SessionError> {
        self.get(id)?.start(&self.scheduler).await
    }

    pub async fn stop(&self, id: Uuid) -> Result<(), SessionError> {
        self.get(id)?.stop().await
    }

    pub fn status(&self, id: Uuid) -> Result<SessionStatus, SessionError> {
        Ok(self.get(id)?.status())
    }

    /// Removes the session, stopping its loop first if it is running.
    pub async fn delete(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self
            .sessions()
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        session.stop().await?;
        info!(session_id = %id, "session deleted");
        Ok(())
    }

    pub fn attach(
        &self,
        id: Uuid,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriberId, SessionError> {
        Ok(self.get(id)?.attach(subscriber))
    }

    pub fn detach(&self, id: Uuid, subscriber: SubscriberId) -> Result<bool, SessionError> {
        Ok(self.get(id)?.detach(subscriber))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}
