use thiserror::Error;

use crate::env::EnvError;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("observation {state} is outside the declared state space of {n_states}")]
    StateOutOfRange { state: usize, n_states: usize },

    #[error("transition model is invalid: {0}")]
    InvalidModel(String),

    #[error("environment has an empty {0} space")]
    EmptySpace(&'static str),
}
