use tabula::env::{Env, EnvError, EnvState, FrozenLake, GridWorld};
use tabula::solver::{
    LearnerParams, MonteCarlo, NStepTd, PolicyIteration, QLearning, Sarsa, Solver,
    ValueIteration, evaluate_greedy,
};

fn train(solver: &mut dyn Solver, env: &mut dyn Env) -> usize {
    let mut records = 0;
    while solver.next_update(env).unwrap().is_some() {
        records += 1;
    }
    assert!(solver.is_finished());
    records
}

fn params(learning_rate: f64, n_episodes: usize, max_steps: usize) -> LearnerParams {
    LearnerParams {
        discount: 0.99,
        learning_rate,
        epsilon: 0.1,
        n_episodes,
        max_steps,
    }
}

#[test]
fn q_learning_finds_shortest_path_on_small_grid() {
    let mut env = GridWorld::new(3);
    let mut solver = QLearning::new(params(0.5, 2000, 100), 9, 4, 7);
    train(&mut solver, &mut env);

    let rollout = evaluate_greedy(&mut solver, &mut env, 20).unwrap();
    assert_eq!(rollout.episode_length, 4);
    assert_eq!(rollout.final_state(), Some(env.goal()));
}

#[test]
fn sarsa_finds_shortest_path_on_small_grid() {
    let mut env = GridWorld::new(3);
    let mut solver = Sarsa::new(params(0.1, 3000, 100), 9, 4, 11);
    train(&mut solver, &mut env);

    let rollout = evaluate_greedy(&mut solver, &mut env, 20).unwrap();
    assert_eq!(rollout.episode_length, 4);
    assert_eq!(rollout.final_state(), Some(env.goal()));
}

#[test]
fn q_learning_crosses_non_slippery_frozen_lake() {
    let mut env = FrozenLake::new(5, false, 0).unwrap();
    let mut solver = QLearning::new(params(0.5, 2000, 100), 25, 4, 0);
    train(&mut solver, &mut env);

    let rollout = evaluate_greedy(&mut solver, &mut env, 100).unwrap();
    assert_eq!(rollout.total_reward, 1.0);
    assert_eq!(rollout.final_state(), Some(env.goal()));
}

#[test]
fn planners_agree_on_values_and_policy() {
    let discount = 0.9;
    let mut env = GridWorld::new(4);
    let mut policy_iteration = PolicyIteration::new(&env, discount, 1000, 1).unwrap();
    let mut value_iteration = ValueIteration::new(&env, discount, 1000, 2).unwrap();
    train(&mut policy_iteration, &mut env);
    train(&mut value_iteration, &mut env);

    let pi_values = policy_iteration.value_table().to_vec();
    let vi_values = value_iteration.value_table().to_vec();
    for (state, (a, b)) in pi_values.iter().zip(&vi_values).enumerate() {
        assert!((a - b).abs() < 1e-4, "state {state}: {a} vs {b}");
    }

    // every action either planner picks is optimal under the shared values
    for state in 0..env.state_space_size() {
        let action_value = |action: usize| -> f64 {
            env.transitions(state, action)
                .unwrap()
                .iter()
                .map(|t| {
                    let future = if t.terminal { 0.0 } else { discount * vi_values[t.next_state] };
                    t.probability * (t.reward + future)
                })
                .sum()
        };
        let best = (0..4).map(action_value).fold(f64::NEG_INFINITY, f64::max);
        for solver in [&mut policy_iteration as &mut dyn Solver, &mut value_iteration] {
            let action = solver.select_action(state);
            assert!(
                action_value(action) >= best - 1e-4,
                "state {state}: action {action} is not greedy"
            );
        }
    }
}

/// A single decision: every action ends the episode with its own reward.
struct Bandit {
    payouts: [f64; 3],
}

impl Env for Bandit {
    fn reset(&mut self) -> Result<EnvState, EnvError> {
        Ok(EnvState::initial(0, serde_json::Value::Null))
    }

    fn step(&mut self, action: usize) -> Result<EnvState, EnvError> {
        Ok(EnvState {
            observation: 1,
            reward: self.payouts[action],
            done: true,
            info: serde_json::Value::Null,
        })
    }

    fn state_space_size(&self) -> usize {
        2
    }

    fn action_space_size(&self) -> usize {
        3
    }

    fn render(&self) -> serde_json::Value {
        serde_json::json!({ "payouts": self.payouts })
    }

    fn visual_state(&self) -> serde_json::Value {
        serde_json::json!(0)
    }
}

#[test]
fn one_step_td_and_first_visit_monte_carlo_agree_on_single_step_episodes() {
    let params = LearnerParams {
        discount: 0.9,
        learning_rate: 1.0,
        epsilon: 0.0,
        n_episodes: 1,
        max_steps: 10,
    };
    let payouts = [0.25, -0.5, 0.75];

    let mut td_env = Bandit { payouts };
    let mut td = NStepTd::one_step(params, 2, 3, 5);
    let td_record = td.next_update(&mut td_env).unwrap().unwrap();

    let mut mc_env = Bandit { payouts };
    let mut mc = MonteCarlo::new(params, true, 2, 3, 5);
    let mc_record = mc.next_update(&mut mc_env).unwrap().unwrap();

    assert_eq!(td_record.action, mc_record.action);
    let action = td_record.action;
    assert_eq!(td.table().get(0, action), payouts[action]);
    assert_eq!(mc.table().get(0, action), payouts[action]);
    assert_eq!(td.table(), mc.table());
}
