//! Backend type aliases and device management
//!
//! Training runs on an autodiff-wrapped NdArray backend; the inference loop
//! uses plain NdArray. A 7x7 board and a two-layer MLP do not need a GPU.

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Backend used by the PPO learner (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Backend used to run a loaded policy
pub type InferenceBackend = NdArray<f32>;

/// Default CPU device
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}
