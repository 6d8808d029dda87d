use serde::{Deserialize, Serialize};

/// Outcome of `reset` or `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvState {
    pub observation: usize,
    pub reward: f64,
    pub done: bool,
    pub info: serde_json::Value, // Keep it simple for now
}

impl EnvState {
    pub fn initial(observation: usize, info: serde_json::Value) -> Self {
        Self {
            observation,
            reward: 0.0,
            done: false,
            info,
        }
    }
}

/// One possible outcome of taking an action in a state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub probability: f64,
    pub next_state: usize,
    pub reward: f64,
    pub terminal: bool,
}

impl Transition {
    pub fn new(probability: f64, next_state: usize, reward: f64, terminal: bool) -> Self {
        Self {
            probability,
            next_state,
            reward,
            terminal,
        }
    }
}
