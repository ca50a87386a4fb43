//! Prioritized experience replay.
//!
//! Transitions are drawn with probability proportional to their priority
//! $p_i = \min(|\delta_i| + \epsilon, \delta_{max})^\alpha$, where $\delta_i$ is the error
//! reported by the learner. The bias of non-uniform sampling is corrected with importance
//! sampling weights
//!
//! $$w_i = \left(\frac{P(i)}{\min_j P(j)}\right)^{-\beta},$$
//!
//! so that the transition with the smallest probability in the buffer gets weight 1 and
//! every other transition gets a weight below 1.
use super::{IwScheduler, PerConfig, PrioritySumTree, ReplayBufferConfig, TransitionBatch};
use crate::{error::PerError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A replay buffer sampling transitions in proportion to their priorities.
///
/// # Examples
///
/// ```rust
/// use per_core::replay_buffer::{PerConfig, PrioritizedReplayBuffer};
///
/// let mut buffer = PrioritizedReplayBuffer::new(8, &PerConfig::default(), 42).unwrap();
/// for i in 0..8 {
///     buffer.store(i).unwrap();
/// }
///
/// let batch = buffer.sample(4).unwrap();
/// let td_errs = vec![0.5; batch.len()];
/// buffer.update_priorities(&batch.ix_sample, &td_errs).unwrap();
/// ```
#[derive(Debug)]
pub struct PrioritizedReplayBuffer<T> {
    sum_tree: PrioritySumTree<T>,
    iw_scheduler: IwScheduler,
    alpha: f32,
    epsilon: f32,
    abs_err_upper: f32,
    rng: StdRng,
}

impl<T: Clone> PrioritizedReplayBuffer<T> {
    /// Creates a buffer with `capacity` slots.
    ///
    /// Fails if `capacity` is zero or a field of `per_config` is out of its range
    /// (see [`PerConfig::validate`]).
    pub fn new(capacity: usize, per_config: &PerConfig, seed: u64) -> Result<Self> {
        per_config.validate()?;
        let sum_tree = PrioritySumTree::new(capacity)?;
        info!(
            "Prioritized replay buffer: capacity = {}, alpha = {}, beta_0 = {}",
            capacity, per_config.alpha, per_config.beta_0
        );

        Ok(Self {
            sum_tree,
            iw_scheduler: IwScheduler::new(
                per_config.beta_0,
                per_config.beta_increment,
                per_config.beta_final,
            ),
            alpha: per_config.alpha,
            epsilon: per_config.epsilon,
            abs_err_upper: per_config.abs_err_upper,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.sum_tree.len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.sum_tree.is_empty()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.sum_tree.capacity()
    }

    /// Current exponent of importance sampling weights.
    pub fn beta(&self) -> f32 {
        self.iw_scheduler.beta()
    }

    /// Sum of all priorities.
    pub fn total_priority(&self) -> f32 {
        self.sum_tree.total_priority()
    }

    /// The underlying sum tree.
    pub fn sum_tree(&self) -> &PrioritySumTree<T> {
        &self.sum_tree
    }

    /// Priority assigned to a transition with error `td_err`.
    pub fn priority_of(&self, td_err: f32) -> f32 {
        (td_err.abs() + self.epsilon).min(self.abs_err_upper).powf(self.alpha)
    }

    /// Stores a transition and returns its leaf index.
    ///
    /// The transition gets the largest priority currently in the buffer, or
    /// `abs_err_upper` if there is none, so that it is sampled at least once before
    /// the learner reports an error for it.
    pub fn store(&mut self, tr: T) -> Result<usize, PerError> {
        let max_p = match self.sum_tree.max_leaf_priority() {
            p if p > 0f32 => p,
            _ => self.abs_err_upper,
        };
        self.sum_tree.insert(max_p, tr)
    }

    /// Samples `n` transitions with the internal random number generator.
    pub fn sample(&mut self, n: usize) -> Result<TransitionBatch<T>, PerError> {
        Self::stratified_sample(&self.sum_tree, &mut self.iw_scheduler, n, &mut self.rng)
    }

    /// Samples `n` transitions drawing random numbers from `rng`.
    pub fn sample_with_rng<R: Rng>(
        &mut self,
        n: usize,
        rng: &mut R,
    ) -> Result<TransitionBatch<T>, PerError> {
        Self::stratified_sample(&self.sum_tree, &mut self.iw_scheduler, n, rng)
    }

    // [0, total) is split into n segments of equal mass and one value is drawn from each.
    fn stratified_sample<R: Rng>(
        sum_tree: &PrioritySumTree<T>,
        iw_scheduler: &mut IwScheduler,
        n: usize,
        rng: &mut R,
    ) -> Result<TransitionBatch<T>, PerError> {
        if n == 0 {
            return Err(PerError::EmptyBatch);
        }
        if n > sum_tree.capacity() {
            return Err(PerError::BatchSizeExceedsCapacity {
                batch_size: n,
                capacity: sum_tree.capacity(),
            });
        }
        let total = sum_tree.total_priority();
        if !(total > 0f32) {
            return Err(PerError::ZeroTotalPriority);
        }

        let was_annealed = iw_scheduler.is_annealed();
        let beta = iw_scheduler.step();
        if !was_annealed && iw_scheduler.is_annealed() {
            debug!("beta reached its final value {}", beta);
        } else {
            trace!("beta = {}", beta);
        }

        let min_p = sum_tree.min_leaf_priority().ok_or(PerError::ZeroTotalPriority)?;
        let min_prob = min_p / total;
        let segment = total / n as f32;

        let mut batch = TransitionBatch::with_capacity(n);
        let mut weight = Vec::with_capacity(n);
        for i in 0..n {
            let s = segment * (i as f32 + rng.gen::<f32>());
            let (ix, p, tr) = sum_tree.retrieve(s)?;
            let prob = p / total;
            weight.push((prob / min_prob).powf(-beta));
            batch.ix_sample.push(ix);
            batch.transitions.push(tr.clone());
        }
        batch.weight = Some(weight);

        Ok(batch)
    }

    /// Updates the priorities of sampled transitions from their errors.
    ///
    /// `ixs` are leaf indices returned in [`TransitionBatch::ix_sample`]. An index whose
    /// slot has been overwritten since it was sampled updates the new occupant. An index
    /// whose slot has never been written is rejected with [`PerError::EmptySlot`].
    /// Nothing is written unless every pair is valid.
    pub fn update_priorities(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<(), PerError> {
        if ixs.len() != td_errs.len() {
            return Err(PerError::LengthMismatch {
                n_ixs: ixs.len(),
                n_errs: td_errs.len(),
            });
        }
        for (&ix, &td_err) in ixs.iter().zip(td_errs.iter()) {
            self.sum_tree.priority(ix)?;
            let slot = self.sum_tree.leaf_to_slot(ix);
            if self.sum_tree.get(slot).is_none() {
                warn!("Rejected priority update of leaf {} that holds no transition", ix);
                return Err(PerError::EmptySlot(slot));
            }
            if td_err.is_nan() {
                return Err(PerError::InvalidPriority(td_err));
            }
        }

        for (&ix, &td_err) in ixs.iter().zip(td_errs.iter()) {
            let p = self.priority_of(td_err);
            self.sum_tree.update(ix, p)?;
        }
        debug!(
            "Updated {} priorities, total priority = {}",
            ixs.len(),
            self.sum_tree.total_priority()
        );

        Ok(())
    }
}

impl<T: Clone> ExperienceBufferBase for PrioritizedReplayBuffer<T> {
    type Item = T;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.store(tr)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.sum_tree.len()
    }
}

impl<T: Clone> ReplayBufferBase for PrioritizedReplayBuffer<T> {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch<T>;

    /// Builds the buffer, with the default [`PerConfig`] if `config.per_config` is `None`.
    fn build(config: &Self::Config) -> Result<Self> {
        let per_config = config.per_config.clone().unwrap_or_default();
        Self::new(config.capacity, &per_config, config.seed)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }

    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()> {
        Ok(self.update_priorities(ixs, td_errs)?)
    }
}
