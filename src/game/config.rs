use serde::{Deserialize, Serialize};

/// Configuration for the snake environment
///
/// Defaults describe the training setup: one snake of length one on a 7x7
/// grid, with the construction-time environment checker switched off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of snakes on the board; snake 0 is the one the agent controls
    pub n_snakes: usize,
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Body length each snake starts with
    pub initial_snake_length: usize,
    /// Skip the environment checker when the environment is built
    pub disable_env_checker: bool,

    /// Reward for eating food
    pub food_reward: f32,
    /// Reward for a step that neither eats nor dies
    pub step_reward: f32,
    /// Reward for dying
    pub death_penalty: f32,
    /// Truncate episodes after this many steps
    pub max_episode_steps: Option<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            n_snakes: 1,
            grid_width: 7,
            grid_height: 7,
            initial_snake_length: 1,
            disable_env_checker: true,
            food_reward: 1.0,
            step_reward: 0.0,
            death_penalty: -1.0,
            max_episode_steps: None,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Check that snakes can be spawned on the configured board
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(format!(
                "grid must be non-empty, got {}x{}",
                self.grid_width, self.grid_height
            ));
        }

        if self.n_snakes == 0 {
            return Err("n_snakes must be at least 1".to_string());
        }

        if self.n_snakes > self.grid_height {
            return Err(format!(
                "n_snakes ({}) cannot exceed grid_height ({})",
                self.n_snakes, self.grid_height
            ));
        }

        if self.initial_snake_length == 0 {
            return Err("initial_snake_length must be at least 1".to_string());
        }

        // Snakes spawn mid-row heading right with the body trailing left
        let max_length = self.grid_width / 2 + 1;
        if self.initial_snake_length > max_length {
            return Err(format!(
                "initial_snake_length ({}) does not fit a {}-wide grid (max {})",
                self.initial_snake_length, self.grid_width, max_length
            ));
        }

        if !self.food_reward.is_finite()
            || !self.step_reward.is_finite()
            || !self.death_penalty.is_finite()
        {
            return Err("rewards must be finite".to_string());
        }

        if self.max_episode_steps == Some(0) {
            return Err("max_episode_steps must be at least 1 when set".to_string());
        }

        Ok(())
    }
}
