use super::errors::EnvError;
use super::types::{EnvState, Transition};

/// A discrete-state Markov environment.
///
/// Every session owns exactly one instance; implementations keep their
/// own step counter and random source and are never shared.
pub trait Env: Send {
    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Result<EnvState, EnvError>;

    /// Applies `action` and returns the resulting observation. Implementations
    /// cap the episode length themselves and report the cap as `done`.
    fn step(&mut self, action: usize) -> Result<EnvState, EnvError>;

    fn state_space_size(&self) -> usize;

    fn action_space_size(&self) -> usize;

    /// Structured snapshot for visualization.
    fn render(&self) -> serde_json::Value;

    /// Payload placed in the `state` field of update records.
    fn visual_state(&self) -> serde_json::Value;

    fn is_model_based(&self) -> bool {
        false
    }

    /// Full outcome distribution of `action` in `state`. Only model-based
    /// environments implement this; probabilities sum to 1.
    fn transitions(&self, _state: usize, _action: usize) -> Result<Vec<Transition>, EnvError> {
        Err(EnvError::NotModelBased)
    }
}

pub(crate) fn check_action(action: usize, n_actions: usize) -> Result<(), EnvError> {
    if action < n_actions {
        Ok(())
    } else {
        Err(EnvError::InvalidAction { action, n_actions })
    }
}

pub(crate) fn check_state(state: usize, n_states: usize) -> Result<(), EnvError> {
    if state < n_states {
        Ok(())
    } else {
        Err(EnvError::InvalidState { state, n_states })
    }
}
