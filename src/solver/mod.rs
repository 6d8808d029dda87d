mod episode;
mod errors;
mod evaluator;
mod exploration;
mod monte_carlo;
mod n_step_td;
mod planning;
mod policy_iteration;
mod q_learning;
mod sarsa;
mod table;
mod traits;
mod value_iteration;

pub use episode::LearnerParams;
pub use errors::SolverError;
pub use evaluator::{Rollout, evaluate_greedy};
pub use exploration::{EpsilonGreedy, greedy_action};
pub use monte_carlo::{MonteCarlo, credited_steps, episode_returns};
pub use n_step_td::NStepTd;
pub use planning::THETA;
pub use policy_iteration::{MAX_EVALUATION_SWEEPS, PolicyIteration};
pub use q_learning::QLearning;
pub use sarsa::Sarsa;
pub use table::QTable;
pub use traits::Solver;
pub use value_iteration::ValueIteration;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigError, TrainingConfig};
use crate::env::Env;
use crate::update::{PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Identifiers of the available algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    PolicyIteration,
    ValueIteration,
    QLearning,
    Sarsa,
    MonteCarlo,
    TdLearning,
    NStepTd,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 7] = [
        AlgorithmKind::PolicyIteration,
        AlgorithmKind::ValueIteration,
        AlgorithmKind::QLearning,
        AlgorithmKind::Sarsa,
        AlgorithmKind::MonteCarlo,
        AlgorithmKind::TdLearning,
        AlgorithmKind::NStepTd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::PolicyIteration => "policy_iteration",
            AlgorithmKind::ValueIteration => "value_iteration",
            AlgorithmKind::QLearning => "q_learning",
            AlgorithmKind::Sarsa => "sarsa",
            AlgorithmKind::MonteCarlo => "monte_carlo",
            AlgorithmKind::TdLearning => "td_learning",
            AlgorithmKind::NStepTd => "n_step_td",
        }
    }

    /// Planners need the environment's transition model.
    pub fn requires_model(&self) -> bool {
        matches!(
            self,
            AlgorithmKind::PolicyIteration | AlgorithmKind::ValueIteration
        )
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of solvers a session can drive.
pub enum AnySolver {
    PolicyIteration(PolicyIteration),
    ValueIteration(ValueIteration),
    QLearning(QLearning),
    Sarsa(Sarsa),
    MonteCarlo(MonteCarlo),
    TdLearning(NStepTd),
    NStepTd(NStepTd),
}

macro_rules! dispatch {
    ($self:expr, $solver:ident => $body:expr) => {
        match $self {
            AnySolver::PolicyIteration($solver) => $body,
            AnySolver::ValueIteration($solver) => $body,
            AnySolver::QLearning($solver) => $body,
            AnySolver::Sarsa($solver) => $body,
            AnySolver::MonteCarlo($solver) => $body,
            AnySolver::TdLearning($solver) => $body,
            AnySolver::NStepTd($solver) => $body,
        }
    };
}

impl AnySolver {
    pub fn kind(&self) -> AlgorithmKind {
        match self {
            AnySolver::PolicyIteration(_) => AlgorithmKind::PolicyIteration,
            AnySolver::ValueIteration(_) => AlgorithmKind::ValueIteration,
            AnySolver::QLearning(_) => AlgorithmKind::QLearning,
            AnySolver::Sarsa(_) => AlgorithmKind::Sarsa,
            AnySolver::MonteCarlo(_) => AlgorithmKind::MonteCarlo,
            AnySolver::TdLearning(_) => AlgorithmKind::TdLearning,
            AnySolver::NStepTd(_) => AlgorithmKind::NStepTd,
        }
    }
}

impl Solver for AnySolver {
    fn next_update(&mut self, env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError> {
        dispatch!(self, solver => solver.next_update(env))
    }

    fn value_function(&self) -> ValueSnapshot {
        dispatch!(self, solver => solver.value_function())
    }

    fn policy(&mut self) -> PolicySnapshot {
        dispatch!(self, solver => solver.policy())
    }

    fn select_action(&mut self, state: usize) -> usize {
        dispatch!(self, solver => solver.select_action(state))
    }

    fn is_finished(&self) -> bool {
        dispatch!(self, solver => solver.is_finished())
    }
}

/// Largest `Q(s, a)` table a solver will allocate.
pub const MAX_TABLE_ENTRIES: usize = 1 << 26;

/// Builds the solver named by `config.algorithm` for `env`.
///
/// Fails with [`ConfigError::ModelRequired`] when a planner is paired with
/// an environment that has no transition model, and with
/// [`ConfigError::Environment`] when the model it exposes is inconsistent.
pub fn create_solver(
    config: &TrainingConfig,
    env: &dyn Env,
    seed: u64,
) -> Result<AnySolver, ConfigError> {
    let algorithm = config.algorithm;
    if algorithm.requires_model() && !env.is_model_based() {
        return Err(ConfigError::ModelRequired {
            algorithm,
            environment: config.environment,
        });
    }

    let n_states = env.state_space_size();
    let n_actions = env.action_space_size();
    if n_states == 0 || n_actions == 0 {
        return Err(ConfigError::Environment(format!(
            "{} declares {n_states} states and {n_actions} actions",
            config.environment
        )));
    }
    if n_states
        .checked_mul(n_actions)
        .is_none_or(|entries| entries > MAX_TABLE_ENTRIES)
    {
        return Err(ConfigError::Environment(format!(
            "{} has {n_states} states and {n_actions} actions, more than {MAX_TABLE_ENTRIES} table entries",
            config.environment
        )));
    }

    let params = LearnerParams::from(config);
    let model_error = |err: SolverError| ConfigError::Environment(err.to_string());
    let solver = match algorithm {
        AlgorithmKind::PolicyIteration => AnySolver::PolicyIteration(
            PolicyIteration::new(env, config.discount_factor, config.n_episodes, seed)
                .map_err(model_error)?,
        ),
        AlgorithmKind::ValueIteration => AnySolver::ValueIteration(
            ValueIteration::new(env, config.discount_factor, config.n_episodes, seed)
                .map_err(model_error)?,
        ),
        AlgorithmKind::QLearning => {
            AnySolver::QLearning(QLearning::new(params, n_states, n_actions, seed))
        }
        AlgorithmKind::Sarsa => AnySolver::Sarsa(Sarsa::new(params, n_states, n_actions, seed)),
        AlgorithmKind::MonteCarlo => AnySolver::MonteCarlo(MonteCarlo::new(
            params,
            config.first_visit,
            n_states,
            n_actions,
            seed,
        )),
        AlgorithmKind::TdLearning => {
            AnySolver::TdLearning(NStepTd::one_step(params, n_states, n_actions, seed))
        }
        AlgorithmKind::NStepTd => AnySolver::NStepTd(NStepTd::new(
            params,
            config.n_step,
            n_states,
            n_actions,
            seed,
        )),
    };
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{CartPole, EnvironmentKind, GridWorld};

    #[test]
    fn factory_covers_every_algorithm() {
        let env = GridWorld::new(3);
        for algorithm in AlgorithmKind::ALL {
            let config = TrainingConfig::new(EnvironmentKind::GridWorld, algorithm);
            let solver = create_solver(&config, &env, 7).unwrap();
            assert_eq!(solver.kind(), algorithm);
            assert_eq!(solver.value_function().0.len(), 9);
        }
    }

    #[test]
    fn planners_need_a_model() {
        let env = CartPole::new(2, 0);
        let config = TrainingConfig::new(EnvironmentKind::CartPole, AlgorithmKind::ValueIteration);
        assert_eq!(
            create_solver(&config, &env, 0).err(),
            Some(ConfigError::ModelRequired {
                algorithm: AlgorithmKind::ValueIteration,
                environment: EnvironmentKind::CartPole,
            })
        );

        let config = TrainingConfig::new(EnvironmentKind::CartPole, AlgorithmKind::QLearning);
        assert!(create_solver(&config, &env, 0).is_ok());
    }

    /// Declares a state space no table can hold.
    struct Vast;

    impl Env for Vast {
        fn reset(&mut self) -> Result<crate::env::EnvState, crate::env::EnvError> {
            Ok(crate::env::EnvState::initial(0, serde_json::Value::Null))
        }

        fn step(&mut self, _action: usize) -> Result<crate::env::EnvState, crate::env::EnvError> {
            self.reset()
        }

        fn state_space_size(&self) -> usize {
            usize::MAX / 2
        }

        fn action_space_size(&self) -> usize {
            4
        }

        fn render(&self) -> serde_json::Value {
            serde_json::Value::Null
        }

        fn visual_state(&self) -> serde_json::Value {
            serde_json::Value::Null
        }
    }

    #[test]
    fn oversized_tables_are_rejected() {
        let config = TrainingConfig::new(EnvironmentKind::CartPole, AlgorithmKind::QLearning);
        assert!(matches!(
            create_solver(&config, &Vast, 0),
            Err(ConfigError::Environment(_))
        ));
    }

    #[test]
    fn td_learning_ignores_lookahead() {
        let env = GridWorld::new(3);
        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, AlgorithmKind::TdLearning);
        config.n_step = 4;
        match create_solver(&config, &env, 0).unwrap() {
            AnySolver::TdLearning(solver) => assert_eq!(solver.lookahead(), 1),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn algorithm_names_round_trip_through_serde() {
        for algorithm in AlgorithmKind::ALL {
            let json = serde_json::to_string(&algorithm).unwrap();
            assert_eq!(json, format!("\"{algorithm}\""));
        }
    }
}
