//! Rolling training statistics for the PPO loop

use std::collections::VecDeque;

use crate::rl::UpdateStats;

/// Fixed-capacity window of recent values with a running sum
#[derive(Debug, Clone)]
pub struct Rolling {
    values: VecDeque<f64>,
    sum: f64,
    capacity: usize,
}

impl Rolling {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            sum: 0.0,
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    /// Mean of the window, 0 when empty
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Episode and loss statistics over a rolling window
///
/// # Example
///
/// ```rust
/// use ml_lab::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
///
/// stats.record_episode(15.5, 150, 5);
/// stats.record_losses(0.02, 0.05, 0.8);
///
/// assert_eq!(stats.total_episodes(), 1);
/// assert!(stats.format_summary().contains("Reward: 15.50"));
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    rewards: Rolling,
    lengths: Rolling,
    /// Food eaten per episode
    scores: Rolling,
    policy_losses: Rolling,
    value_losses: Rolling,
    entropies: Rolling,
    total_episodes: usize,
    /// Steps across finished episodes only
    total_steps: usize,
    best_score: u32,
}

impl TrainingStats {
    /// Track the last `window_size` episodes and updates
    pub fn new(window_size: usize) -> Self {
        let window = || Rolling::new(window_size);
        Self {
            rewards: window(),
            lengths: window(),
            scores: window(),
            policy_losses: window(),
            value_losses: window(),
            entropies: window(),
            total_episodes: 0,
            total_steps: 0,
            best_score: 0,
        }
    }

    /// Record a finished episode: total reward, steps taken and food eaten
    pub fn record_episode(&mut self, reward: f32, length: usize, score: u32) {
        self.rewards.push(f64::from(reward));
        self.lengths.push(length as f64);
        self.scores.push(f64::from(score));
        self.total_episodes += 1;
        self.total_steps += length;
        self.best_score = self.best_score.max(score);
    }

    /// Record the averaged losses of a PPO update
    pub fn record_update(&mut self, update: &UpdateStats) {
        self.record_losses(update.policy_loss, update.value_loss, update.entropy);
    }

    pub fn record_losses(&mut self, policy_loss: f32, value_loss: f32, entropy: f32) {
        self.policy_losses.push(f64::from(policy_loss));
        self.value_losses.push(f64::from(value_loss));
        self.entropies.push(f64::from(entropy));
    }

    pub fn mean_episode_reward(&self) -> f32 {
        self.rewards.mean() as f32
    }

    pub fn mean_episode_length(&self) -> f32 {
        self.lengths.mean() as f32
    }

    pub fn mean_episode_score(&self) -> f32 {
        self.scores.mean() as f32
    }

    pub fn mean_policy_loss(&self) -> f32 {
        self.policy_losses.mean() as f32
    }

    pub fn mean_value_loss(&self) -> f32 {
        self.value_losses.mean() as f32
    }

    pub fn mean_entropy(&self) -> f32 {
        self.entropies.mean() as f32
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Highest score of any recorded episode
    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn window_size(&self) -> usize {
        self.rewards.capacity()
    }

    /// One-line summary of the rolling statistics
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Reward: {:.2} | Score: {:.2} (best {}) | Len: {:.1} | P_Loss: {:.4} | V_Loss: {:.4} | Entropy: {:.4}",
            self.total_episodes,
            self.mean_episode_reward(),
            self.mean_episode_score(),
            self.best_score,
            self.mean_episode_length(),
            self.mean_policy_loss(),
            self.mean_value_loss(),
            self.mean_entropy(),
        )
    }

    /// Emit the rolling statistics as a structured log event
    pub fn log_summary(&self, timesteps: usize, updates: usize) {
        tracing::info!(
            timesteps,
            updates,
            episodes = self.total_episodes,
            mean_reward = self.mean_episode_reward(),
            mean_score = self.mean_episode_score(),
            best_score = self.best_score,
            mean_length = self.mean_episode_length(),
            policy_loss = self.mean_policy_loss(),
            value_loss = self.mean_value_loss(),
            entropy = self.mean_entropy(),
            "training progress"
        );
    }
}
