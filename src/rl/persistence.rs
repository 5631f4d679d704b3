//! Saving and loading trained policies
//!
//! A model is stored as two files next to each other:
//! - `<path>.mpk` with the network weights (Burn named MessagePack record)
//! - `<path>.meta.json` with the metadata needed to rebuild the network

use super::{ActorCriticConfig, ActorCriticNetwork, PPOAgent, PPOConfig};
use crate::game::GameConfig;
use anyhow::{Context, Result, ensure};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata saved with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Network shape; the weights can only be loaded into this exact shape
    pub network_config: ActorCriticConfig,

    pub ppo_config: PPOConfig,

    /// Board the policy was trained on
    pub game_config: GameConfig,

    /// Environment steps collected
    pub total_timesteps: usize,

    /// PPO updates performed
    pub updates: usize,

    pub episodes_trained: usize,

    /// Crate version that wrote the model
    pub version: String,
}

impl ModelMetadata {
    /// Snapshot an agent's configuration and counters
    pub fn from_agent<B: AutodiffBackend>(
        agent: &PPOAgent<B>,
        game_config: &GameConfig,
        total_timesteps: usize,
    ) -> Self {
        Self {
            network_config: agent.network_config().clone(),
            ppo_config: agent.config().clone(),
            game_config: game_config.clone(),
            total_timesteps,
            updates: agent.training_step(),
            episodes_trained: agent.episodes_trained(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Path of the weights file for a model base path
pub fn weights_path(path: &Path) -> PathBuf {
    path.with_extension("mpk")
}

/// Path of the metadata file for a model base path
pub fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension("meta.json")
}

/// Save network weights and metadata under `path`
///
/// Creates parent directories if they don't exist. Existing files are
/// overwritten.
pub fn save_model<B: Backend>(
    network: &ActorCriticNetwork<B>,
    metadata: &ModelMetadata,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    // The recorder adds the .mpk extension itself
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(network.clone().into_record(), path.to_path_buf())
        .context("Failed to save network weights")?;

    let meta_path = metadata_path(path);
    let meta_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(&meta_path, meta_json)
        .with_context(|| format!("Failed to write metadata to {:?}", meta_path))?;

    tracing::info!(path = %weights_path(path).display(), "saved model");
    Ok(())
}

/// Read only the metadata of a saved model
pub fn load_metadata(path: &Path) -> Result<ModelMetadata> {
    let meta_path = metadata_path(path);
    let meta_json = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata from {:?}", meta_path))?;

    serde_json::from_str(&meta_json)
        .with_context(|| format!("Failed to deserialize metadata in {:?}", meta_path))
}

/// Load a saved network and its metadata onto any backend
pub fn load_network<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> Result<(ActorCriticNetwork<B>, ModelMetadata)> {
    let metadata = load_metadata(path)?;

    let network = metadata.network_config.init::<B>(device);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.to_path_buf(), device)
        .with_context(|| format!("Failed to load network weights from {:?}", weights_path(path)))?;

    Ok((network.load_record(record), metadata))
}

/// Load a policy that must accept observations of `expected_shape`
///
/// Fails when the saved network was built for a different board.
pub fn load_policy<B: Backend>(
    path: &Path,
    expected_shape: [usize; 3],
    device: &B::Device,
) -> Result<(ActorCriticNetwork<B>, ModelMetadata)> {
    let (network, metadata) = load_network::<B>(path, device)?;

    let saved_shape = metadata.network_config.observation_shape();
    ensure!(
        saved_shape == expected_shape,
        "Model at {:?} expects observations of shape {:?}, environment produces {:?}",
        path,
        saved_shape,
        expected_shape
    );

    tracing::info!(
        path = %weights_path(path).display(),
        updates = metadata.updates,
        timesteps = metadata.total_timesteps,
        "loaded model"
    );

    Ok((network, metadata))
}
