//! Construction-time sanity checks for the snake environment
//!
//! Verifies that observations have the advertised shape and binary values,
//! that every action can be applied, and that rewards are finite. The
//! environment is left freshly reset afterwards.

use anyhow::{Result, anyhow, ensure};
use burn::tensor::{Tensor, backend::Backend};

use super::environment::{Environment, SnakeEnvironment};

/// Run all checks against `env`
pub fn check_environment<B: Backend>(env: &mut SnakeEnvironment<B>) -> Result<()> {
    let expected = env.observation_shape();
    let n_snakes = env.config().n_snakes;

    let obs = env.reset();
    check_observation(&obs, expected, "reset")?;

    ensure!(env.num_actions() > 0, "action space is empty");

    for action in 0..env.num_actions() {
        env.reset();
        let transition = env.step(action);
        let context = format!("step({action})");

        check_observation(&transition.observation, expected, &context)?;
        ensure!(
            transition.reward.is_finite(),
            "{context}: reward {} is not finite",
            transition.reward
        );
        ensure!(
            (0..=n_snakes as i32).contains(&transition.alive_snakes),
            "{context}: alive count {} outside 0..={n_snakes}",
            transition.alive_snakes
        );
    }

    env.reset();
    Ok(())
}

/// Check one observation's shape and value set
pub fn check_observation<B: Backend>(
    obs: &Tensor<B, 3>,
    expected: [usize; 3],
    context: &str,
) -> Result<()> {
    ensure!(
        obs.dims() == expected,
        "{context}: observation shape {:?} does not match {:?}",
        obs.dims(),
        expected
    );

    let values = obs
        .to_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("{context}: unreadable observation: {e:?}"))?;

    ensure!(
        values.iter().all(|&v| v == 0.0 || v == 1.0),
        "{context}: observation values must be 0 or 1"
    );

    Ok(())
}
