//! Querying a policy for actions

use anyhow::{Result, anyhow, ensure};
use burn::tensor::{Tensor, activation::softmax, backend::Backend};
use rand::Rng;

use super::network::ActorCriticNetwork;

/// Anything that maps an observation to a discrete action
pub trait Policy<O> {
    /// Pick an action for `observation`.
    ///
    /// With `deterministic` the most likely action is returned, otherwise one
    /// is sampled from the action distribution.
    fn predict(&self, observation: &O, deterministic: bool) -> Result<usize>;
}

impl<B: Backend> Policy<Tensor<B, 3>> for ActorCriticNetwork<B> {
    fn predict(&self, observation: &Tensor<B, 3>, deterministic: bool) -> Result<usize> {
        let (action_logits, _value) = self.forward(observation.clone().unsqueeze_dim(0));
        let probs = action_probabilities(action_logits)?;

        Ok(if deterministic {
            argmax(&probs)
        } else {
            sample_categorical(&probs, &mut rand::thread_rng())
        })
    }
}

/// Softmax over a `[1, num_actions]` logits tensor
pub fn action_probabilities<B: Backend>(action_logits: Tensor<B, 2>) -> Result<Vec<f32>> {
    let probs: Vec<f32> = softmax(action_logits, 1)
        .into_data()
        .to_vec()
        .map_err(|e| anyhow!("Failed to read action probabilities: {e:?}"))?;

    ensure!(!probs.is_empty(), "Policy produced an empty action distribution");
    ensure!(
        probs.iter().all(|p| p.is_finite()),
        "Policy produced non-finite action probabilities"
    );

    Ok(probs)
}

/// Draw an index from a categorical distribution
pub fn sample_categorical<R: Rng + ?Sized>(probs: &[f32], rng: &mut R) -> usize {
    let random_val: f32 = rng.gen();
    let mut cumsum = 0.0;

    for (idx, &prob) in probs.iter().enumerate() {
        cumsum += prob;
        if random_val < cumsum {
            return idx;
        }
    }

    // Rounding can leave the cumulative sum just under 1.0
    probs.len().saturating_sub(1)
}

/// Index of the largest probability
pub fn argmax(probs: &[f32]) -> usize {
    probs
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
