//! ML Lab - a PPO snake agent and a sensor-data viewer
//!
//! This library provides:
//! - Core snake game logic (game module)
//! - PPO training, model persistence and policy inference (rl module)
//! - CSV loading, time filtering and plottable series (data module)
//! - TUI rendering of the board and of line charts (render module)
//! - Execution modes: train, play and plot (modes module)

pub mod data;
pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod rl;
