//! Rollout storage for PPO
//!
//! Holds one rollout of transitions, turns it into advantages and returns with
//! Generalized Advantage Estimation (GAE), and hands out shuffled minibatches.

use burn::tensor::{Int, Tensor, TensorData, backend::Backend};
use rand::seq::SliceRandom;

/// Minibatch ready to be moved onto the training backend
pub struct Minibatch {
    /// `[batch, channels, height, width]`
    pub observations: TensorData,
    /// `[batch]`, Int
    pub actions: TensorData,
    /// `[batch]`
    pub old_log_probs: TensorData,
    /// `[batch]`, normalized
    pub advantages: TensorData,
    /// `[batch]`
    pub returns: TensorData,
}

/// Experience buffer for one PPO rollout
///
/// # Example
///
/// ```rust
/// use ml_lab::rl::RolloutBuffer;
/// use burn::backend::ndarray::{NdArray, NdArrayDevice};
/// use burn::tensor::Tensor;
///
/// let device = NdArrayDevice::default();
/// let mut buffer = RolloutBuffer::<NdArray<f32>>::new(2, device.clone());
///
/// buffer.push(Tensor::zeros([4, 7, 7], &device), 0, -1.4, 0.0, 0.1, false);
/// buffer.push(Tensor::zeros([4, 7, 7], &device), 3, -1.3, 1.0, 0.2, true);
/// assert!(buffer.is_full());
///
/// buffer.compute_advantages(0.99, 0.95, 0.0);
/// let batches = buffer.sample_indices(2);
/// let batch = buffer.get_batch(&batches[0]);
/// assert_eq!(batch.observations.shape, vec![2, 4, 7, 7]);
/// ```
pub struct RolloutBuffer<B: Backend> {
    observations: Vec<Tensor<B, 3>>,
    actions: Vec<usize>,
    log_probs: Vec<f32>,
    rewards: Vec<f32>,
    values: Vec<f32>,
    /// `dones[t]` is true when transition `t` ended its episode
    dones: Vec<bool>,
    capacity: usize,
    device: B::Device,
    advantages: Option<Vec<f32>>,
    returns: Option<Vec<f32>>,
}

impl<B: Backend> RolloutBuffer<B> {
    pub fn new(capacity: usize, device: B::Device) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            log_probs: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
            capacity,
            device,
            advantages: None,
            returns: None,
        }
    }

    /// Add a transition; ignored once the buffer is full
    pub fn push(
        &mut self,
        observation: Tensor<B, 3>,
        action: usize,
        log_prob: f32,
        reward: f32,
        value: f32,
        done: bool,
    ) {
        if self.is_full() {
            return;
        }

        self.observations.push(observation);
        self.actions.push(action);
        self.log_probs.push(log_prob);
        self.rewards.push(reward);
        self.values.push(value);
        self.dones.push(done);
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Compute advantages and returns with GAE
    ///
    /// ```text
    /// δ_t = r_t + γ * V(s_{t+1}) * (1 - done_t) - V(s_t)
    /// A_t = δ_t + γλ * (1 - done_t) * A_{t+1}
    /// R_t = A_t + V(s_t)
    /// ```
    ///
    /// `last_value` is V of the observation following the final transition and
    /// only matters if that transition did not end its episode. Advantages are
    /// normalized to zero mean and unit variance; returns are not.
    pub fn compute_advantages(&mut self, gamma: f32, gae_lambda: f32, last_value: f32) {
        let n = self.len();
        if n == 0 {
            return;
        }

        let mut advantages = vec![0.0; n];
        let mut returns = vec![0.0; n];

        let mut next_value = last_value;
        let mut next_advantage = 0.0;

        for t in (0..n).rev() {
            let mask = if self.dones[t] { 0.0 } else { 1.0 };

            let delta = self.rewards[t] + gamma * next_value * mask - self.values[t];
            advantages[t] = delta + gamma * gae_lambda * next_advantage * mask;
            returns[t] = advantages[t] + self.values[t];

            next_value = self.values[t];
            next_advantage = advantages[t];
        }

        let mean = advantages.iter().sum::<f32>() / n as f32;
        let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n as f32;
        let std = variance.sqrt();

        for a in &mut advantages {
            *a = (*a - mean) / (std + 1e-8);
        }

        self.advantages = Some(advantages);
        self.returns = Some(returns);
    }

    /// Gather the transitions at `indices` into a minibatch
    ///
    /// # Panics
    ///
    /// Panics if `indices` is empty or advantages have not been computed.
    pub fn get_batch(&self, indices: &[usize]) -> Minibatch {
        let advantages = self
            .advantages
            .as_ref()
            .expect("Advantages must be computed before getting batches");
        let returns = self
            .returns
            .as_ref()
            .expect("Returns must be computed before getting batches");
        assert!(!indices.is_empty(), "Cannot create batch from empty indices");

        let observations: Tensor<B, 4> = Tensor::stack(
            indices
                .iter()
                .map(|&i| self.observations[i].clone())
                .collect(),
            0,
        );

        let actions: Vec<i64> = indices.iter().map(|&i| self.actions[i] as i64).collect();
        let actions = Tensor::<B, 1, Int>::from_ints(actions.as_slice(), &self.device);

        let gather = |values: &[f32]| -> TensorData {
            let picked: Vec<f32> = indices.iter().map(|&i| values[i]).collect();
            TensorData::new(picked, [indices.len()])
        };

        Minibatch {
            observations: observations.into_data(),
            actions: actions.into_data(),
            old_log_probs: gather(self.log_probs.as_slice()),
            advantages: gather(advantages.as_slice()),
            returns: gather(returns.as_slice()),
        }
    }

    /// Shuffle all stored indices and split them into minibatches
    ///
    /// The last batch is smaller when the length is not a multiple of `batch_size`.
    pub fn sample_indices(&self, batch_size: usize) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut rand::thread_rng());

        indices
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Drop all transitions and computed targets
    pub fn clear(&mut self) {
        self.observations.clear();
        self.actions.clear();
        self.log_probs.clear();
        self.rewards.clear();
        self.values.clear();
        self.dones.clear();
        self.advantages = None;
        self.returns = None;
    }

    #[cfg(test)]
    fn returns(&self) -> Option<&[f32]> {
        self.returns.as_deref()
    }
}
