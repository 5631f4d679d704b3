//! PPO (Proximal Policy Optimization) agent
//!
//! Action selection during rollouts, the clipped surrogate loss and the
//! minibatch update loop.

use super::buffer::RolloutBuffer;
use super::config::PPOConfig;
use super::network::{ActorCriticConfig, ActorCriticNetwork};
use super::policy::{action_probabilities, sample_categorical};
use anyhow::{Result, anyhow};
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{
        ElementConversion, Int, Tensor,
        activation::{log_softmax, softmax},
        backend::AutodiffBackend,
    },
};

/// Averaged losses of one PPO update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub total_loss: f32,
}

/// PPO agent
///
/// Couples the actor-critic network with its optimizer and rollout buffer.
/// The buffer lives on the inner (non-autodiff) backend; minibatches are
/// moved onto the autodiff backend only for the update.
pub struct PPOAgent<B: AutodiffBackend> {
    network: ActorCriticNetwork<B>,
    network_config: ActorCriticConfig,
    optim: OptimizerAdaptor<Adam, ActorCriticNetwork<B>, B>,
    config: PPOConfig,
    buffer: RolloutBuffer<B::InnerBackend>,
    /// PPO updates performed
    training_step: usize,
    episodes_trained: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> PPOAgent<B> {
    /// Create an agent for a freshly initialized or loaded network
    ///
    /// # Example
    ///
    /// ```rust
    /// use ml_lab::rl::{ActorCriticConfig, PPOAgent, PPOConfig, TrainingBackend, default_device};
    ///
    /// let device = default_device();
    /// let network_config = ActorCriticConfig::new(7, 7);
    /// let network = network_config.init::<TrainingBackend>(&device);
    ///
    /// let agent = PPOAgent::new(network, network_config, PPOConfig::default(), device).unwrap();
    /// assert_eq!(agent.training_step(), 0);
    /// ```
    pub fn new(
        network: ActorCriticNetwork<B>,
        network_config: ActorCriticConfig,
        config: PPOConfig,
        device: B::Device,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid PPO configuration: {e}"))?;

        let optim = AdamConfig::new()
            .with_epsilon(1e-5)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(config.max_grad_norm)))
            .init();

        let buffer = RolloutBuffer::new(config.update_frequency, device.clone());

        Ok(Self {
            network,
            network_config,
            optim,
            config,
            buffer,
            training_step: 0,
            episodes_trained: 0,
            device,
        })
    }

    /// Sample an action for a rollout step
    ///
    /// Returns `(action, log_prob, value)`.
    pub fn select_action(&self, observation: Tensor<B::InnerBackend, 3>) -> Result<(usize, f32, f32)> {
        let network = self.network.valid();
        let (action_logits, value) = network.forward(observation.unsqueeze_dim(0));

        let probs = action_probabilities(action_logits)?;
        let action = sample_categorical(&probs, &mut rand::thread_rng());
        let log_prob = probs[action].max(f32::MIN_POSITIVE).ln();

        let value = value.into_scalar().elem::<f32>();

        Ok((action, log_prob, value))
    }

    /// Value estimate V(s), used to bootstrap the end of a rollout
    pub fn value(&self, observation: Tensor<B::InnerBackend, 3>) -> f32 {
        let (_, value) = self.network.valid().forward(observation.unsqueeze_dim(0));
        value.into_scalar().elem::<f32>()
    }

    pub fn store_transition(
        &mut self,
        observation: Tensor<B::InnerBackend, 3>,
        action: usize,
        log_prob: f32,
        reward: f32,
        value: f32,
        done: bool,
    ) {
        self.buffer
            .push(observation, action, log_prob, reward, value, done);
    }

    /// Whether a full rollout has been collected
    pub fn should_update(&self) -> bool {
        self.buffer.is_full()
    }

    /// Transitions stored since the last update
    pub fn pending_transitions(&self) -> usize {
        self.buffer.len()
    }

    /// Run one PPO update over the collected rollout and clear it
    ///
    /// `last_value` is V of the observation after the final stored transition.
    pub fn update(&mut self, last_value: f32) -> UpdateStats {
        self.buffer
            .compute_advantages(self.config.gamma, self.config.gae_lambda, last_value);

        let mut total_policy_loss = 0.0;
        let mut total_value_loss = 0.0;
        let mut total_entropy = 0.0;
        let mut total_loss_sum = 0.0;
        let mut n_updates = 0;

        for _epoch in 0..self.config.n_epochs {
            for indices in self.buffer.sample_indices(self.config.batch_size) {
                let batch = self.buffer.get_batch(&indices);

                let obs: Tensor<B, 4> = Tensor::from_data(batch.observations, &self.device);
                let actions: Tensor<B, 1, Int> = Tensor::from_data(batch.actions, &self.device);
                let old_log_probs: Tensor<B, 1> =
                    Tensor::from_data(batch.old_log_probs, &self.device);
                let advantages: Tensor<B, 1> = Tensor::from_data(batch.advantages, &self.device);
                let returns: Tensor<B, 1> = Tensor::from_data(batch.returns, &self.device);

                let (action_logits, values) = self.network.forward(obs);

                let (policy_loss, entropy) =
                    self.compute_policy_loss(&action_logits, &actions, &old_log_probs, &advantages);
                let value_loss = self.compute_value_loss(&values, &returns);

                // L = L_policy - c_entropy * H + c_value * L_value
                let total_loss = policy_loss.clone() - entropy.clone() * self.config.entropy_coef
                    + value_loss.clone() * self.config.value_coef;

                let grads = total_loss.backward();
                let grads = GradientsParams::from_grads(grads, &self.network);
                self.network = self
                    .optim
                    .step(self.config.learning_rate, self.network.clone(), grads);

                total_policy_loss += policy_loss.into_scalar().elem::<f32>();
                total_value_loss += value_loss.into_scalar().elem::<f32>();
                total_entropy += entropy.into_scalar().elem::<f32>();
                total_loss_sum += total_loss.into_scalar().elem::<f32>();
                n_updates += 1;
            }
        }

        self.buffer.clear();
        self.training_step += 1;

        let n = n_updates.max(1) as f32;
        UpdateStats {
            policy_loss: total_policy_loss / n,
            value_loss: total_value_loss / n,
            entropy: total_entropy / n,
            total_loss: total_loss_sum / n,
        }
    }

    /// Clipped surrogate loss and mean policy entropy
    ///
    /// ```text
    /// L = -E[min(r * A, clip(r, 1-ε, 1+ε) * A)],  r = π_new / π_old
    /// ```
    fn compute_policy_loss(
        &self,
        action_logits: &Tensor<B, 2>,
        actions: &Tensor<B, 1, Int>,
        old_log_probs: &Tensor<B, 1>,
        advantages: &Tensor<B, 1>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let log_probs = log_softmax(action_logits.clone(), 1);
        let new_log_probs = log_probs
            .clone()
            .gather(1, actions.clone().unsqueeze_dim(1))
            .squeeze::<1>(1);

        let ratio = (new_log_probs - old_log_probs.clone()).exp();

        let surr1 = ratio.clone() * advantages.clone();
        let surr2 = ratio.clamp(
            1.0 - self.config.clip_epsilon,
            1.0 + self.config.clip_epsilon,
        ) * advantages.clone();

        let policy_loss = surr1.min_pair(surr2).neg().mean();

        // H = -E[Σ π(a|s) * log π(a|s)]
        let probs = softmax(action_logits.clone(), 1);
        let entropy = (probs * log_probs).sum_dim(1).neg().mean();

        (policy_loss, entropy)
    }

    /// Mean squared error between V(s) and the GAE returns
    fn compute_value_loss(&self, values: &Tensor<B, 2>, returns: &Tensor<B, 1>) -> Tensor<B, 1> {
        let diff = values.clone().squeeze::<1>(1) - returns.clone();
        (diff.clone() * diff).mean()
    }

    /// PPO updates performed so far
    pub fn training_step(&self) -> usize {
        self.training_step
    }

    pub fn network(&self) -> &ActorCriticNetwork<B> {
        &self.network
    }

    pub fn network_config(&self) -> &ActorCriticConfig {
        &self.network_config
    }

    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    pub fn episodes_trained(&self) -> usize {
        self.episodes_trained
    }

    pub fn increment_episode(&mut self) {
        self.episodes_trained += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::rl::{Environment, SnakeEnvironment};
    use burn::backend::{
        Autodiff,
        ndarray::{NdArray, NdArrayDevice},
    };

    type TestBackend = Autodiff<NdArray<f32>>;
    type TestInferenceBackend = NdArray<f32>;

    fn create_test_agent(update_frequency: usize, batch_size: usize) -> PPOAgent<TestBackend> {
        let device = NdArrayDevice::default();
        let network_config = ActorCriticConfig::new(7, 7);
        let network = network_config.init::<TestBackend>(&device);
        let ppo_config = PPOConfig {
            update_frequency,
            batch_size,
            n_epochs: 2,
            ..PPOConfig::default()
        };

        PPOAgent::new(network, network_config, ppo_config, device).unwrap()
    }

    fn create_test_observation() -> Tensor<TestInferenceBackend, 3> {
        Tensor::zeros([4, 7, 7], &NdArrayDevice::default())
    }

    #[test]
    fn test_agent_creation() {
        let agent = create_test_agent(128, 32);
        assert_eq!(agent.training_step(), 0);
        assert_eq!(agent.episodes_trained(), 0);
        assert!(!agent.should_update());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let device = NdArrayDevice::default();
        let network_config = ActorCriticConfig::new(7, 7);
        let network = network_config.init::<TestBackend>(&device);
        let ppo_config = PPOConfig {
            batch_size: 0,
            ..PPOConfig::default()
        };

        assert!(PPOAgent::new(network, network_config, ppo_config, device).is_err());
    }

    #[test]
    fn test_select_action() {
        let agent = create_test_agent(128, 32);

        let (action, log_prob, value) = agent.select_action(create_test_observation()).unwrap();

        assert!(action < 4);
        assert!(log_prob < 0.0);
        assert!(value.is_finite());
    }

    #[test]
    fn test_buffer_fills() {
        let mut agent = create_test_agent(16, 8);
        for _ in 0..16 {
            agent.store_transition(create_test_observation(), 0, -1.0, 1.0, 0.5, false);
        }
        assert!(agent.should_update());
    }

    #[test]
    fn test_update_with_small_buffer() {
        let mut agent = create_test_agent(32, 16);

        for i in 0..32 {
            agent.store_transition(create_test_observation(), i % 4, -1.4, 1.0, 0.5, i == 31);
        }

        let stats = agent.update(0.0);

        assert!(stats.policy_loss.is_finite());
        assert!(stats.value_loss.is_finite());
        assert!(stats.entropy > 0.0);
        assert!(stats.total_loss.is_finite());
        assert!(!agent.should_update());
        assert_eq!(agent.training_step(), 1);
    }

    #[test]
    fn test_policy_loss_computation() {
        let agent = create_test_agent(128, 32);
        let device = NdArrayDevice::default();

        let action_logits = Tensor::from_floats([[1.0, 2.0, 3.0, 4.0]], &device);
        let actions = Tensor::from_ints([2], &device);
        let old_log_probs = Tensor::from_floats([-1.5], &device);
        let advantages = Tensor::from_floats([0.5], &device);

        let (policy_loss, entropy) =
            agent.compute_policy_loss(&action_logits, &actions, &old_log_probs, &advantages);

        assert_eq!(policy_loss.dims(), [1]);
        let entropy_val: f32 = entropy.into_scalar().elem();
        assert!(entropy_val > 0.0);
    }

    #[test]
    fn test_value_loss_computation() {
        let agent = create_test_agent(128, 32);
        let device = NdArrayDevice::default();

        let values = Tensor::from_floats([[0.5], [0.8], [0.3]], &device);
        let returns = Tensor::from_floats([0.5, 0.8, 0.3], &device);

        let loss: f32 = agent
            .compute_value_loss(&values, &returns)
            .into_scalar()
            .elem();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_integration_with_environment() {
        let device = NdArrayDevice::default();
        let mut env =
            SnakeEnvironment::<TestInferenceBackend>::new(GameConfig::default(), device);
        let mut agent = create_test_agent(32, 16);

        let mut obs = env.reset();

        for _ in 0..32 {
            let (action, log_prob, value) = agent.select_action(obs.clone()).unwrap();
            let transition = env.step(action);

            agent.store_transition(obs, action, log_prob, transition.reward, value, transition.terminated);

            obs = if transition.terminated {
                env.reset()
            } else {
                transition.observation
            };
        }

        assert!(agent.should_update());

        let last_value = agent.value(obs);
        let stats = agent.update(last_value);

        assert!(stats.policy_loss.is_finite());
        assert!(stats.value_loss.is_finite());
        assert!(stats.entropy.is_finite());
    }
}
