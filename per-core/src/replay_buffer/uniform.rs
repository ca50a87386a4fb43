//! Replay buffer with uniform sampling.
use super::{ReplayBufferConfig, TransitionBatch};
use crate::{error::PerError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A ring buffer of transitions sampled uniformly with replacement.
///
/// Sample indices are slot indices. Batches carry no importance weights.
#[derive(Debug)]
pub struct UniformReplayBuffer<T> {
    capacity: usize,
    i: usize,
    data: Vec<T>,
    rng: StdRng,
}

impl<T: Clone> UniformReplayBuffer<T> {
    /// Creates a buffer with `capacity` slots.
    pub fn new(capacity: usize, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(PerError::InvalidCapacity(capacity).into());
        }
        info!("Uniform replay buffer: capacity = {}", capacity);

        Ok(Self {
            capacity,
            i: 0,
            data: Vec::with_capacity(capacity),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Transition stored in a slot, if any.
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.data.get(slot)
    }

    /// Stores a transition, overwriting the oldest one when the buffer is full.
    ///
    /// Returns the slot index written.
    pub fn store(&mut self, tr: T) -> usize {
        let slot = self.i;
        if self.data.len() < self.capacity {
            self.data.push(tr);
        } else {
            self.data[slot] = tr;
        }

        self.i += 1;
        if self.i == self.capacity {
            self.i = 0;
        }
        slot
    }

    /// Samples `n` transitions with the internal random number generator.
    pub fn sample(&mut self, n: usize) -> Result<TransitionBatch<T>, PerError> {
        Self::uniform_sample(&self.data, self.capacity, n, &mut self.rng)
    }

    /// Samples `n` transitions drawing random numbers from `rng`.
    pub fn sample_with_rng<R: Rng>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<TransitionBatch<T>, PerError> {
        Self::uniform_sample(&self.data, self.capacity, n, rng)
    }

    fn uniform_sample<R: Rng>(
        data: &[T],
        capacity: usize,
        n: usize,
        rng: &mut R,
    ) -> Result<TransitionBatch<T>, PerError> {
        if n == 0 {
            return Err(PerError::EmptyBatch);
        }
        if n > capacity {
            return Err(PerError::BatchSizeExceedsCapacity {
                batch_size: n,
                capacity,
            });
        }
        if data.is_empty() {
            return Err(PerError::ZeroTotalPriority);
        }

        let mut batch = TransitionBatch::with_capacity(n);
        for _ in 0..n {
            let ix = rng.gen_range(0..data.len());
            batch.ix_sample.push(ix);
            batch.transitions.push(data[ix].clone());
        }
        Ok(batch)
    }

    /// Checks the arguments of a priority update. Priorities are not used in this buffer.
    pub fn update_priorities(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<(), PerError> {
        if ixs.len() != td_errs.len() {
            return Err(PerError::LengthMismatch {
                n_ixs: ixs.len(),
                n_errs: td_errs.len(),
            });
        }
        if let Some(&ix) = ixs.iter().find(|&&ix| ix >= self.capacity) {
            warn!("Slot {} is out of range of the uniform replay buffer", ix);
        }
        Ok(())
    }
}

impl<T: Clone> ExperienceBufferBase for UniformReplayBuffer<T> {
    type Item = T;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.store(tr);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

impl<T: Clone> ReplayBufferBase for UniformReplayBuffer<T> {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch<T>;

    /// Builds the buffer. `config.per_config` is ignored.
    fn build(config: &Self::Config) -> Result<Self> {
        Self::new(config.capacity, config.seed)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }

    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()> {
        Ok(self.update_priorities(ixs, td_errs)?)
    }
}
