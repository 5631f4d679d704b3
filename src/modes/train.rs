//! Training mode for the PPO agent
//!
//! Collects a fixed number of environment steps, runs a PPO update every time
//! the rollout buffer fills and writes the final policy to disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use ml_lab::modes::{TrainConfig, TrainMode};
//! use ml_lab::rl::{TrainingBackend, default_device};
//!
//! let config = TrainConfig::default(); // 1M steps, saved as `snake_dqn`
//! let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device())?;
//! train_mode.run()?;
//! ```

use anyhow::{Context, Result, anyhow};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::game::GameConfig;
use crate::metrics::TrainingStats;
use crate::rl::{
    ActorCriticConfig, Environment, ModelMetadata, PPOAgent, PPOConfig, SnakeEnvironment,
    save_model,
};

/// Configuration for training mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Environment steps to collect
    pub total_timesteps: usize,

    /// Base path of the final model (`.mpk` and `.meta.json` are added)
    pub save_path: PathBuf,

    /// Save a checkpoint every N PPO updates (0 disables checkpoints)
    pub checkpoint_frequency: usize,

    /// Log progress every N PPO updates
    pub log_frequency: usize,

    pub game_config: GameConfig,

    pub ppo_config: PPOConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            total_timesteps: 1_000_000,
            save_path: PathBuf::from("snake_dqn"),
            checkpoint_frequency: 0,
            log_frequency: 10,
            game_config: GameConfig::default(),
            ppo_config: PPOConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Default configuration with a different step budget and save path
    ///
    /// ```rust
    /// use ml_lab::modes::TrainConfig;
    ///
    /// let config = TrainConfig::new(10_000, "models/snake".into());
    /// assert_eq!(config.game_config.grid_width, 7);
    /// ```
    pub fn new(total_timesteps: usize, save_path: PathBuf) -> Self {
        Self {
            total_timesteps,
            save_path,
            ..Self::default()
        }
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training config {:?}", path))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse training config {:?}", path))
    }

    /// Path of the checkpoint written after `update` PPO updates
    fn checkpoint_path(&self, update: usize) -> PathBuf {
        let stem = self
            .save_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        self.save_path
            .with_file_name(format!("{stem}_update{update}"))
    }
}

/// Training mode for the PPO agent
pub struct TrainMode<B: AutodiffBackend> {
    agent: PPOAgent<B>,
    env: SnakeEnvironment<B::InnerBackend>,
    stats: TrainingStats,
    config: TrainConfig,
    /// Environment steps collected so far
    total_steps: usize,
}

impl<B: AutodiffBackend> TrainMode<B> {
    /// Build the environment and a freshly initialized agent
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        if config.log_frequency == 0 {
            return Err(anyhow!("log_frequency must be positive"));
        }

        let env = SnakeEnvironment::make(config.game_config.clone(), device.clone())
            .context("Failed to create training environment")?;

        let network_config = ActorCriticConfig::new(
            config.game_config.grid_height,
            config.game_config.grid_width,
        );
        let network = network_config.init::<B>(&device);
        let agent = PPOAgent::new(network, network_config, config.ppo_config.clone(), device)?;

        Ok(Self {
            agent,
            env,
            stats: TrainingStats::new(100),
            config,
            total_steps: 0,
        })
    }

    /// Collect `total_timesteps` steps, updating whenever the buffer fills,
    /// then save the model to `save_path`
    pub fn run(&mut self) -> Result<()> {
        self.log_header();

        let mut obs = self.env.reset();
        let mut episode_reward = 0.0;
        let mut episode_steps = 0;

        while self.total_steps < self.config.total_timesteps {
            let (action, log_prob, value) = self.agent.select_action(obs.clone())?;
            let transition = self.env.step(action);

            self.agent.store_transition(
                obs,
                action,
                log_prob,
                transition.reward,
                value,
                transition.terminated,
            );

            episode_reward += transition.reward;
            episode_steps += 1;
            self.total_steps += 1;

            obs = if transition.terminated {
                self.stats
                    .record_episode(episode_reward, episode_steps, self.env.state().score());
                self.agent.increment_episode();
                episode_reward = 0.0;
                episode_steps = 0;
                self.env.reset()
            } else {
                transition.observation
            };

            if self.agent.should_update() {
                let last_value = self.agent.value(obs.clone());
                self.run_update(last_value)?;
            }
        }

        if self.agent.pending_transitions() > 0 {
            tracing::debug!(
                transitions = self.agent.pending_transitions(),
                "updating on final partial rollout"
            );
            let last_value = self.agent.value(obs);
            self.run_update(last_value)?;
        }

        self.save_to(&self.config.save_path)
            .with_context(|| format!("Failed to save final model to {:?}", self.config.save_path))?;

        tracing::info!(
            timesteps = self.total_steps,
            updates = self.agent.training_step(),
            "training complete: {}",
            self.stats.format_summary()
        );

        Ok(())
    }

    fn run_update(&mut self, last_value: f32) -> Result<()> {
        let update = self.agent.update(last_value);
        self.stats.record_update(&update);

        let updates = self.agent.training_step();

        if updates % self.config.log_frequency == 0 {
            self.stats.log_summary(self.total_steps, updates);
        }

        if self.config.checkpoint_frequency > 0 && updates % self.config.checkpoint_frequency == 0 {
            let checkpoint_path = self.config.checkpoint_path(updates);
            self.save_to(&checkpoint_path)
                .with_context(|| format!("Failed to save checkpoint to {:?}", checkpoint_path))?;
        }

        Ok(())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let metadata =
            ModelMetadata::from_agent(&self.agent, &self.config.game_config, self.total_steps);
        save_model(self.agent.network(), &metadata, path)
    }

    fn log_header(&self) {
        let ppo = &self.config.ppo_config;
        let game = &self.config.game_config;

        tracing::info!(
            total_timesteps = self.config.total_timesteps,
            grid = %format!("{}x{}", game.grid_width, game.grid_height),
            n_snakes = game.n_snakes,
            save_path = %self.config.save_path.display(),
            "starting PPO training"
        );
        tracing::info!(
            learning_rate = ppo.learning_rate,
            gamma = ppo.gamma,
            gae_lambda = ppo.gae_lambda,
            clip_epsilon = ppo.clip_epsilon,
            entropy_coef = ppo.entropy_coef,
            n_steps = ppo.update_frequency,
            batch_size = ppo.batch_size,
            n_epochs = ppo.n_epochs,
            "PPO hyperparameters"
        );
    }

    /// Environment steps collected so far
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn agent(&self) -> &PPOAgent<B> {
        &self.agent
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::persistence::{metadata_path, weights_path};
    use crate::rl::{TrainingBackend, default_device, load_metadata};
    use tempfile::TempDir;

    fn small_config(save_path: PathBuf, total_timesteps: usize) -> TrainConfig {
        let mut config = TrainConfig::new(total_timesteps, save_path);
        config.log_frequency = 1;
        config.ppo_config.update_frequency = 32;
        config.ppo_config.batch_size = 16;
        config.ppo_config.n_epochs = 1;
        config
    }

    #[test]
    fn test_default_config() {
        let config = TrainConfig::default();
        assert_eq!(config.total_timesteps, 1_000_000);
        assert_eq!(config.save_path, PathBuf::from("snake_dqn"));
        assert_eq!(config.game_config, GameConfig::default());
        assert_eq!(config.ppo_config, PPOConfig::default());
    }

    #[test]
    fn test_config_from_partial_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("train.json");
        std::fs::write(
            &path,
            r#"{"total_timesteps": 5000, "ppo_config": {"batch_size": 32}}"#,
        )
        .unwrap();

        let config = TrainConfig::from_json_file(&path).unwrap();

        assert_eq!(config.total_timesteps, 5000);
        assert_eq!(config.ppo_config.batch_size, 32);
        assert_eq!(config.ppo_config.update_frequency, 2048);
        assert_eq!(config.save_path, PathBuf::from("snake_dqn"));
    }

    #[test]
    fn test_config_from_missing_file_fails() {
        assert!(TrainConfig::from_json_file(Path::new("/nonexistent/train.json")).is_err());
    }

    #[test]
    fn test_checkpoint_path() {
        let config = TrainConfig::new(10, PathBuf::from("models/snake_dqn"));
        assert_eq!(
            config.checkpoint_path(3),
            PathBuf::from("models/snake_dqn_update3")
        );
    }

    #[test]
    fn test_invalid_game_config_fails() {
        let mut config = TrainConfig::new(10, PathBuf::from("unused"));
        config.game_config.grid_width = 0;

        assert!(TrainMode::<TrainingBackend>::new(config, default_device()).is_err());
    }

    #[test]
    fn test_run_collects_exact_timesteps_and_saves() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("snake_dqn");

        let config = small_config(save_path.clone(), 80);
        let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device()).unwrap();
        train_mode.run().unwrap();

        assert_eq!(train_mode.total_steps(), 80);
        // Two full rollouts of 32 plus one partial rollout of 16
        assert_eq!(train_mode.agent().training_step(), 3);
        assert!(weights_path(&save_path).exists());
        assert!(metadata_path(&save_path).exists());

        let metadata = load_metadata(&save_path).unwrap();
        assert_eq!(metadata.total_timesteps, 80);
        assert_eq!(metadata.updates, 3);
    }

    #[test]
    fn test_checkpoints_are_written() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("snake_dqn");

        let mut config = small_config(save_path, 64);
        config.checkpoint_frequency = 1;
        let checkpoint = config.checkpoint_path(2);

        let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device()).unwrap();
        train_mode.run().unwrap();

        assert!(weights_path(&checkpoint).exists());
    }

    #[test]
    fn test_episodes_are_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let config = small_config(temp_dir.path().join("model"), 64);

        let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device()).unwrap();
        train_mode.run().unwrap();

        // A random walk on a 7x7 board reaches a wall well within 64 steps
        assert!(train_mode.stats().total_episodes() > 0);
        assert_eq!(
            train_mode.agent().episodes_trained(),
            train_mode.stats().total_episodes()
        );
    }
}
