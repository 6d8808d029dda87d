use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("action {action} is out of range for {n_actions} actions")]
    InvalidAction { action: usize, n_actions: usize },

    #[error("state {state} is out of range for {n_states} states")]
    InvalidState { state: usize, n_states: usize },

    #[error("environment does not expose transition probabilities")]
    NotModelBased,

    #[error("environment must be reset before stepping")]
    NotReset,

    #[error("no map available for size {0}")]
    UnsupportedSize(usize),

    #[error("{0} state space is too large")]
    StateSpaceTooLarge(&'static str),

    #[error("Environment error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
