use serde::Serialize;

use super::episode::check_observation;
use super::errors::SolverError;
use super::traits::Solver;
use crate::env::Env;

/// One greedy episode. `states` starts with the reset observation, so it
/// holds one more entry than `actions` and `rewards`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollout {
    pub states: Vec<usize>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f64>,
    pub total_reward: f64,
    pub episode_length: usize,
}

impl Rollout {
    pub fn final_state(&self) -> Option<usize> {
        self.states.last().copied()
    }
}

/// Runs one episode following the solver's greedy policy without touching
/// its tables. Stops when the environment is done or after `max_steps`.
/// Observations outside the declared state space are an error.
pub fn evaluate_greedy(
    solver: &mut dyn Solver,
    env: &mut dyn Env,
    max_steps: usize,
) -> Result<Rollout, SolverError> {
    let n_states = env.state_space_size();
    let mut state = check_observation(env.reset()?.observation, n_states)?;
    let mut rollout = Rollout {
        states: vec![state],
        actions: Vec::new(),
        rewards: Vec::new(),
        total_reward: 0.0,
        episode_length: 0,
    };

    for _ in 0..max_steps {
        let action = solver.select_action(state);
        let outcome = env.step(action)?;
        rollout.actions.push(action);
        rollout.rewards.push(outcome.reward);
        rollout.total_reward += outcome.reward;
        rollout.episode_length += 1;
        state = check_observation(outcome.observation, n_states)?;
        rollout.states.push(state);
        if outcome.done {
            break;
        }
    }
    Ok(rollout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{EnvError, EnvState, GridWorld};
    use crate::solver::{LearnerParams, QLearning, ValueIteration};

    /// Declares two states but walks off to state 5 on the first step.
    struct Leaky;

    impl Env for Leaky {
        fn reset(&mut self) -> Result<EnvState, EnvError> {
            Ok(EnvState::initial(0, serde_json::Value::Null))
        }

        fn step(&mut self, _action: usize) -> Result<EnvState, EnvError> {
            Ok(EnvState::initial(5, serde_json::Value::Null))
        }

        fn state_space_size(&self) -> usize {
            2
        }

        fn action_space_size(&self) -> usize {
            2
        }

        fn render(&self) -> serde_json::Value {
            serde_json::Value::Null
        }

        fn visual_state(&self) -> serde_json::Value {
            serde_json::Value::Null
        }
    }

    #[test]
    fn follows_planned_policy_to_goal() {
        let mut env = GridWorld::new(3);
        let mut solver = ValueIteration::new(&env, 0.9, 100, 0).unwrap();
        while solver.next_update(&mut env).unwrap().is_some() {}
        let before = solver.value_table().to_vec();

        let rollout = evaluate_greedy(&mut solver, &mut env, 20).unwrap();
        assert_eq!(rollout.episode_length, 4);
        assert_eq!(rollout.final_state(), Some(env.goal()));
        assert_eq!(rollout.states.len(), 5);
        assert!((rollout.total_reward - 0.97).abs() < 1e-9);
        assert_eq!(solver.value_table(), &before[..]);
    }

    #[test]
    fn respects_step_cap() {
        let mut env = GridWorld::new(5);
        let mut solver = ValueIteration::new(&env, 0.9, 1, 0).unwrap();
        let rollout = evaluate_greedy(&mut solver, &mut env, 3).unwrap();
        assert!(rollout.episode_length <= 3);
        assert_eq!(rollout.actions.len(), rollout.rewards.len());
    }

    #[test]
    fn rejects_observations_outside_the_state_space() {
        let params = LearnerParams {
            discount: 0.9,
            learning_rate: 0.1,
            epsilon: 0.0,
            n_episodes: 1,
            max_steps: 10,
        };
        let mut solver = QLearning::new(params, 2, 2, 0);
        let err = evaluate_greedy(&mut solver, &mut Leaky, 10).unwrap_err();
        assert!(matches!(
            err,
            SolverError::StateOutOfRange {
                state: 5,
                n_states: 2
            }
        ));
        assert_eq!(solver.select_action(5), 0);
    }
}
