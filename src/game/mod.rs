//! Snake board simulation
//!
//! Pure game logic with no tensor or terminal dependencies. The RL environment
//! wraps it; the play mode renders it.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

pub use action::{Action, Direction};
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use state::{CollisionType, GameState, Position, Snake};
