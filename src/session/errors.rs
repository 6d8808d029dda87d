use thiserror::Error;
use uuid::Uuid;

use super::types::SessionState;
use crate::config::ConfigError;
use crate::runtime;
use crate::solver::SolverError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("maximum number of sessions ({max}) reached")]
    Capacity { max: usize },

    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error("stream delivery failed: {0}")]
    StreamDelivery(#[from] TransportError),

    #[error("solver fault: {0}")]
    SolverFault(#[from] SolverError),

    #[error("session {id} is {state} and cannot be restarted")]
    NotResumable { id: Uuid, state: SessionState },

    #[error("training task failed: {0}")]
    Runtime(#[from] runtime::Error),
}
