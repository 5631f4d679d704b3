//! Actor-Critic MLP for the snake agent
//!
//! The observation grid is flattened and fed to two independent towers, one
//! for the policy and one for the value estimate, each with two tanh hidden
//! layers.
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, 4, H, W]
//!   ↓ Flatten: [batch, 4*H*W]
//!   ├─→ Linear(4HW → 64) + tanh → Linear(64 → 64) + tanh → Linear(64 → 4)  action logits
//!   └─→ Linear(4HW → 64) + tanh → Linear(64 → 64) + tanh → Linear(64 → 1)  value
//! ```
//!
//! # Example
//!
//! ```rust
//! use ml_lab::rl::ActorCriticConfig;
//! use burn::backend::ndarray::{NdArray, NdArrayDevice};
//! use burn::tensor::Tensor;
//!
//! let device = NdArrayDevice::default();
//! let network = ActorCriticConfig::new(7, 7).init::<NdArray<f32>>(&device);
//!
//! let (action_logits, value) = network.forward(Tensor::zeros([8, 4, 7, 7], &device));
//!
//! assert_eq!(action_logits.dims(), [8, 4]);
//! assert_eq!(value.dims(), [8, 1]);
//! ```

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, activation::tanh, backend::Backend},
};
use serde::{Deserialize, Serialize};

use super::observation::OBSERVATION_CHANNELS;

/// Shape of the actor-critic network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCriticConfig {
    /// Observation planes (4 for the snake board)
    pub input_channels: usize,

    /// Discrete actions (4 directions)
    pub num_actions: usize,

    pub grid_height: usize,

    pub grid_width: usize,

    /// Width of the two hidden layers in each tower
    pub hidden_sizes: [usize; 2],
}

impl ActorCriticConfig {
    /// Default network for a `grid_height` x `grid_width` board
    pub fn new(grid_height: usize, grid_width: usize) -> Self {
        Self {
            input_channels: OBSERVATION_CHANNELS,
            num_actions: 4,
            grid_height,
            grid_width,
            hidden_sizes: [64, 64],
        }
    }

    /// Observation shape `[channels, height, width]` the network accepts
    pub fn observation_shape(&self) -> [usize; 3] {
        [self.input_channels, self.grid_height, self.grid_width]
    }

    /// Length of a flattened observation
    pub fn input_dim(&self) -> usize {
        self.input_channels * self.grid_height * self.grid_width
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ActorCriticNetwork<B> {
        let [h1, h2] = self.hidden_sizes;

        ActorCriticNetwork {
            policy_fc1: LinearConfig::new(self.input_dim(), h1).init(device),
            policy_fc2: LinearConfig::new(h1, h2).init(device),
            actor_head: LinearConfig::new(h2, self.num_actions).init(device),
            value_fc1: LinearConfig::new(self.input_dim(), h1).init(device),
            value_fc2: LinearConfig::new(h1, h2).init(device),
            critic_head: LinearConfig::new(h2, 1).init(device),
        }
    }
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self::new(7, 7)
    }
}

/// Actor-Critic network with separate policy and value towers
///
/// Generic over the Burn backend so the same module trains under
/// `Autodiff<NdArray>` and runs inference on plain `NdArray`.
#[derive(Module, Debug)]
pub struct ActorCriticNetwork<B: Backend> {
    policy_fc1: Linear<B>,
    policy_fc2: Linear<B>,
    actor_head: Linear<B>,
    value_fc1: Linear<B>,
    value_fc2: Linear<B>,
    critic_head: Linear<B>,
}

impl<B: Backend> ActorCriticNetwork<B> {
    /// Forward pass
    ///
    /// `observation` is `[batch, channels, height, width]`. Returns
    /// `(action_logits [batch, num_actions], value [batch, 1])`.
    pub fn forward(&self, observation: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch_size, channels, height, width] = observation.dims();
        let x = observation.reshape([batch_size, channels * height * width]);

        let pi = tanh(self.policy_fc1.forward(x.clone()));
        let pi = tanh(self.policy_fc2.forward(pi));
        let action_logits = self.actor_head.forward(pi);

        let vf = tanh(self.value_fc1.forward(x));
        let vf = tanh(self.value_fc2.forward(vf));
        let value = self.critic_head.forward(vf);

        (action_logits, value)
    }
}
