//! PPO algorithm hyperparameter configuration

use serde::{Deserialize, Serialize};

/// Hyperparameters of the PPO learner
///
/// Defaults are the values the snake agent is trained with: a strong entropy
/// bonus for exploration, a small learning rate, 2048-step rollouts split into
/// minibatches of 64 and revisited for 10 epochs.
///
/// # Example
///
/// ```rust
/// use ml_lab::rl::PPOConfig;
///
/// let config = PPOConfig {
///     learning_rate: 3e-4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Adam learning rate
    ///
    /// Default: 1e-4
    pub learning_rate: f64,

    /// Discount factor for future rewards
    ///
    /// Default: 0.99
    pub gamma: f32,

    /// GAE lambda, trading bias against variance in advantage estimates
    ///
    /// Default: 0.95
    pub gae_lambda: f32,

    /// PPO clipping range for the probability ratio
    ///
    /// Default: 0.2
    pub clip_epsilon: f32,

    /// Weight of the entropy bonus
    ///
    /// Default: 0.05
    pub entropy_coef: f32,

    /// Weight of the value-function loss
    ///
    /// Default: 0.5
    pub value_coef: f32,

    /// Global gradient norm limit
    ///
    /// Default: 0.5
    pub max_grad_norm: f32,

    /// Passes over the rollout buffer per update
    ///
    /// Default: 10
    pub n_epochs: usize,

    /// Minibatch size
    ///
    /// Default: 64
    pub batch_size: usize,

    /// Environment steps collected between updates; also the buffer capacity
    ///
    /// Default: 2048
    pub update_frequency: usize,
}

impl PPOConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that all hyperparameters are in range
    pub fn validate(&self) -> Result<(), String> {
        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }

        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(format!(
                "gae_lambda must be in [0, 1], got {}",
                self.gae_lambda
            ));
        }

        if self.clip_epsilon <= 0.0 || self.clip_epsilon > 1.0 {
            return Err(format!(
                "clip_epsilon must be in (0, 1], got {}",
                self.clip_epsilon
            ));
        }

        if self.entropy_coef < 0.0 {
            return Err(format!(
                "entropy_coef must be non-negative, got {}",
                self.entropy_coef
            ));
        }

        if self.value_coef < 0.0 {
            return Err(format!(
                "value_coef must be non-negative, got {}",
                self.value_coef
            ));
        }

        if self.max_grad_norm <= 0.0 {
            return Err(format!(
                "max_grad_norm must be positive, got {}",
                self.max_grad_norm
            ));
        }

        if self.n_epochs == 0 {
            return Err("n_epochs must be at least 1".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }

        if self.update_frequency == 0 {
            return Err("update_frequency must be at least 1".to_string());
        }

        if self.batch_size > self.update_frequency {
            return Err(format!(
                "batch_size ({}) cannot exceed update_frequency ({})",
                self.batch_size, self.update_frequency
            ));
        }

        Ok(())
    }
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_epsilon: 0.2,
            entropy_coef: 0.05,
            value_coef: 0.5,
            max_grad_norm: 0.5,
            n_epochs: 10,
            batch_size: 64,
            update_frequency: 2048,
        }
    }
}
