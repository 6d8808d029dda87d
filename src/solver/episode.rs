use super::errors::SolverError;
use crate::config::TrainingConfig;
use crate::update::{Checkpoint, PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Hyper-parameters shared by the model-free learners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnerParams {
    pub discount: f64,
    pub learning_rate: f64,
    pub epsilon: f64,
    pub n_episodes: usize,
    pub max_steps: usize,
}

impl From<&TrainingConfig> for LearnerParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            discount: config.discount_factor,
            learning_rate: config.learning_rate,
            epsilon: config.epsilon,
            n_episodes: config.n_episodes,
            max_steps: config.max_steps,
        }
    }
}

/// Episode and step counters of a step-based learner.
#[derive(Debug, Clone)]
pub(crate) struct EpisodeProgress {
    n_episodes: usize,
    max_steps: usize,
    checkpoint: Checkpoint,
    /// Zero-based index of the current (or next) episode.
    episode: usize,
    step: usize,
    episode_reward: f64,
    /// Sum of rewards over completed episodes.
    cumulative_reward: f64,
    in_episode: bool,
}

impl EpisodeProgress {
    pub(crate) fn new(params: &LearnerParams) -> Self {
        Self {
            n_episodes: params.n_episodes,
            max_steps: params.max_steps,
            checkpoint: Checkpoint::LEARNER,
            episode: 0,
            step: 0,
            episode_reward: 0.0,
            cumulative_reward: 0.0,
            in_episode: false,
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        !self.in_episode && self.episode >= self.n_episodes
    }

    pub(crate) fn in_episode(&self) -> bool {
        self.in_episode
    }

    pub(crate) fn begin(&mut self) {
        self.in_episode = true;
        self.step = 0;
        self.episode_reward = 0.0;
    }

    /// Counts one environment step and returns whether the episode ends
    /// with it, either because the environment is done or the step cap is
    /// reached.
    pub(crate) fn advance(&mut self, reward: f64, done: bool) -> bool {
        self.step += 1;
        self.episode_reward += reward;
        done || self.step >= self.max_steps
    }

    pub(crate) fn wants_snapshot(&self, episode_over: bool) -> bool {
        self.checkpoint.is_due(self.episode, episode_over)
    }

    pub(crate) fn record(
        &self,
        action: usize,
        reward: f64,
        state: serde_json::Value,
        snapshot: Option<(ValueSnapshot, PolicySnapshot)>,
    ) -> UpdateRecord {
        UpdateRecord {
            episode: self.episode + 1,
            step: self.step,
            reward,
            cumulative_reward: self.cumulative_reward + self.episode_reward,
            state,
            action,
            value_function: None,
            policy: None,
        }
        .with_snapshot(snapshot)
    }

    pub(crate) fn finish(&mut self) {
        self.cumulative_reward += self.episode_reward;
        self.episode += 1;
        self.in_episode = false;
    }
}

pub(crate) fn check_observation(state: usize, n_states: usize) -> Result<usize, SolverError> {
    if state < n_states {
        Ok(state)
    } else {
        Err(SolverError::StateOutOfRange { state, n_states })
    }
}
