use anyhow::{Result, anyhow};
use burn::tensor::{Tensor, backend::Backend};

use super::checker::check_environment;
use super::observation::{create_observation, observation_shape};
use crate::game::{Action, Direction, GameConfig, GameEngine, GameState, StepInfo};

/// Outcome of one environment step
#[derive(Debug, Clone)]
pub struct Transition<O> {
    pub observation: O,
    /// Snakes still alive; negative values are treated as a terminal signal
    pub alive_snakes: i32,
    pub reward: f32,
    pub terminated: bool,
    pub info: StepInfo,
}

/// Reset/step contract shared by the snake board and test doubles
pub trait Environment {
    type Observation: Clone;

    /// Start a new episode and return its first observation
    fn reset(&mut self) -> Self::Observation;

    /// Apply a discrete action
    fn step(&mut self, action: usize) -> Transition<Self::Observation>;

    /// Size of the discrete action space
    fn num_actions(&self) -> usize;
}

/// Snake environment for reinforcement learning
///
/// Wraps the game engine with:
/// - Tensor observations (4-channel grid)
/// - 4 discrete actions: 0 Up, 1 Down, 2 Left, 3 Right
/// - The agent steers snake 0; any other snakes keep their heading
pub struct SnakeEnvironment<B: Backend> {
    engine: GameEngine,
    state: GameState,
    device: B::Device,
}

impl<B: Backend> SnakeEnvironment<B> {
    /// Build a validated environment, running the checker unless the config disables it
    pub fn make(config: GameConfig, device: B::Device) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid game configuration: {e}"))?;

        let check = !config.disable_env_checker;
        let mut env = Self::new(config, device);

        if check {
            check_environment(&mut env)?;
            tracing::debug!("environment checker passed");
        }

        Ok(env)
    }

    /// Build without validation or checks
    pub fn new(config: GameConfig, device: B::Device) -> Self {
        Self::from_engine(GameEngine::new(config), device)
    }

    /// Build with a fixed food-placement seed
    pub fn with_seed(config: GameConfig, seed: u64, device: B::Device) -> Self {
        Self::from_engine(GameEngine::with_seed(config, seed), device)
    }

    fn from_engine(mut engine: GameEngine, device: B::Device) -> Self {
        let state = engine.reset();
        Self {
            engine,
            state,
            device,
        }
    }

    /// Current observation without stepping
    pub fn get_observation(&self) -> Tensor<B, 3> {
        create_observation(&self.state, &self.device)
    }

    /// `[channels, height, width]` of every observation this environment emits
    pub fn observation_shape(&self) -> [usize; 3] {
        observation_shape(self.state.grid_height, self.state.grid_width)
    }

    pub fn config(&self) -> &GameConfig {
        self.engine.config()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }
}

impl<B: Backend> Environment for SnakeEnvironment<B> {
    type Observation = Tensor<B, 3>;

    fn reset(&mut self) -> Tensor<B, 3> {
        self.state = self.engine.reset();
        self.get_observation()
    }

    fn step(&mut self, action: usize) -> Transition<Tensor<B, 3>> {
        let result = self
            .engine
            .step(&mut self.state, &[Action::from_index(action)]);

        Transition {
            observation: self.get_observation(),
            alive_snakes: result.alive_snakes as i32,
            reward: result.reward(),
            terminated: result.terminated,
            info: result.info,
        }
    }

    fn num_actions(&self) -> usize {
        Direction::ALL.len()
    }
}
