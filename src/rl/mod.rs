//! Reinforcement learning for the snake board
//!
//! Provides:
//! - 4-channel grid observations (own head, own body, food, other snakes)
//! - The `Environment` reset/step contract and the snake environment
//! - Actor-Critic MLP and the PPO learner
//! - Policy queries and model persistence

pub mod backend;
pub mod buffer;
pub mod checker;
pub mod config;
pub mod environment;
pub mod network;
pub mod observation;
pub mod persistence;
pub mod policy;
pub mod ppo;

pub use backend::{InferenceBackend, TrainingBackend, default_device};
pub use buffer::{Minibatch, RolloutBuffer};
pub use checker::check_environment;
pub use config::PPOConfig;
pub use environment::{Environment, SnakeEnvironment, Transition};
pub use network::{ActorCriticConfig, ActorCriticNetwork};
pub use observation::{OBSERVATION_CHANNELS, create_observation, observation_shape};
pub use persistence::{ModelMetadata, load_metadata, load_network, load_policy, save_model};
pub use policy::Policy;
pub use ppo::{PPOAgent, UpdateStats};
