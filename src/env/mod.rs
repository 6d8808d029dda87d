mod binning;
mod cartpole;
mod errors;
mod frozen_lake;
mod gridworld;
mod mountain_car;
mod traits;
mod types;

pub use cartpole::CartPole;
pub use errors::EnvError;
pub use frozen_lake::FrozenLake;
pub use gridworld::GridWorld;
pub use mountain_car::MountainCar;
pub use traits::Env;
pub use types::{EnvState, Transition};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EnvironmentOptions;

/// Identifiers of the built-in environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentKind {
    #[serde(rename = "gridworld")]
    GridWorld,
    #[serde(rename = "frozenlake")]
    FrozenLake,
    #[serde(rename = "cartpole")]
    CartPole,
    #[serde(rename = "mountaincar")]
    MountainCar,
}

impl EnvironmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::GridWorld => "gridworld",
            EnvironmentKind::FrozenLake => "frozenlake",
            EnvironmentKind::CartPole => "cartpole",
            EnvironmentKind::MountainCar => "mountaincar",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a fresh, exclusively owned environment instance.
///
/// Sizes whose state count overflows are rejected with
/// [`EnvError::StateSpaceTooLarge`].
pub fn create_environment(
    kind: EnvironmentKind,
    options: &EnvironmentOptions,
    seed: u64,
) -> Result<Box<dyn Env>, EnvError> {
    let too_large = || EnvError::StateSpaceTooLarge(kind.as_str());
    let env: Box<dyn Env> = match kind {
        EnvironmentKind::GridWorld => {
            let size = options.grid_size.unwrap_or(GridWorld::DEFAULT_SIZE);
            GridWorld::state_count(size).ok_or_else(too_large)?;
            Box::new(GridWorld::new(size))
        }
        EnvironmentKind::FrozenLake => Box::new(FrozenLake::new(
            options.grid_size.unwrap_or(FrozenLake::DEFAULT_SIZE),
            options.slippery.unwrap_or(true),
            seed,
        )?),
        EnvironmentKind::CartPole => {
            let n_bins = options.n_bins.unwrap_or(CartPole::DEFAULT_BINS);
            CartPole::state_count(n_bins).ok_or_else(too_large)?;
            Box::new(CartPole::new(n_bins, seed))
        }
        EnvironmentKind::MountainCar => {
            let n_bins = options.n_bins.unwrap_or(MountainCar::DEFAULT_BINS);
            MountainCar::state_count(n_bins).ok_or_else(too_large)?;
            Box::new(MountainCar::new(n_bins, seed))
        }
    };
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_honours_options() {
        let options = EnvironmentOptions {
            grid_size: Some(4),
            slippery: Some(false),
            n_bins: None,
        };
        let lake = create_environment(EnvironmentKind::FrozenLake, &options, 0).unwrap();
        assert_eq!(lake.state_space_size(), 16);
        assert!(lake.is_model_based());

        let grid = create_environment(EnvironmentKind::GridWorld, &EnvironmentOptions::default(), 0)
            .unwrap();
        assert_eq!(grid.state_space_size(), 25);

        let cart = create_environment(EnvironmentKind::CartPole, &EnvironmentOptions::default(), 0)
            .unwrap();
        assert!(!cart.is_model_based());

        let car =
            create_environment(EnvironmentKind::MountainCar, &EnvironmentOptions::default(), 0)
                .unwrap();
        assert_eq!(car.state_space_size(), 21 * 21);
        assert_eq!(car.action_space_size(), 3);
    }

    #[test]
    fn overflowing_sizes_are_rejected() {
        let options = EnvironmentOptions {
            grid_size: Some(usize::MAX),
            slippery: None,
            n_bins: Some(70_000),
        };
        for kind in [EnvironmentKind::GridWorld, EnvironmentKind::CartPole] {
            assert!(matches!(
                create_environment(kind, &options, 0),
                Err(EnvError::StateSpaceTooLarge(_))
            ));
        }
        let options = EnvironmentOptions {
            n_bins: Some(usize::MAX),
            ..EnvironmentOptions::default()
        };
        assert!(matches!(
            create_environment(EnvironmentKind::MountainCar, &options, 0),
            Err(EnvError::StateSpaceTooLarge("mountaincar"))
        ));
    }

    #[test]
    fn kinds_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&EnvironmentKind::FrozenLake).unwrap(),
            "\"frozenlake\""
        );
        let kind: EnvironmentKind = serde_json::from_str("\"gridworld\"").unwrap();
        assert_eq!(kind, EnvironmentKind::GridWorld);
        let kind: EnvironmentKind = serde_json::from_str("\"mountaincar\"").unwrap();
        assert_eq!(kind, EnvironmentKind::MountainCar);
    }
}
