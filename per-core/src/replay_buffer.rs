//! Replay buffers with uniform and prioritized sampling.
//!
//! [`ReplayBuffer`] selects one of the two variants at construction from a
//! [`ReplayBufferConfig`]:
//!
//! ```rust
//! use per_core::replay_buffer::{PerConfig, ReplayBuffer, ReplayBufferConfig};
//! use per_core::ReplayBufferBase;
//!
//! let config = ReplayBufferConfig::default()
//!     .capacity(128)
//!     .seed(42)
//!     .per_config(Some(PerConfig::default()));
//! let mut buffer = ReplayBuffer::<Vec<f32>>::build(&config).unwrap();
//! assert!(buffer.is_prioritized());
//!
//! buffer.store(vec![0.0, 1.0, 0.5, 1.0]).unwrap();
//! let batch = buffer.batch(1).unwrap();
//! buffer.update_priority(&batch.ix_sample, &[0.2]).unwrap();
//! ```
mod batch;
mod config;
mod iw_scheduler;
mod prioritized;
mod sum_tree;
mod uniform;
use crate::{error::PerError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
pub use batch::TransitionBatch;
pub use config::{PerConfig, ReplayBufferConfig};
pub use iw_scheduler::IwScheduler;
pub use prioritized::PrioritizedReplayBuffer;
pub use sum_tree::PrioritySumTree;
pub use uniform::UniformReplayBuffer;

/// A replay buffer, either uniform or prioritized.
#[derive(Debug)]
pub enum ReplayBuffer<T> {
    /// Uniform sampling.
    Uniform(UniformReplayBuffer<T>),

    /// Prioritized sampling.
    Prioritized(PrioritizedReplayBuffer<T>),
}

impl<T: Clone> ReplayBuffer<T> {
    /// Returns `true` for the prioritized variant.
    pub fn is_prioritized(&self) -> bool {
        matches!(self, Self::Prioritized(_))
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        match self {
            Self::Uniform(b) => b.capacity(),
            Self::Prioritized(b) => b.capacity(),
        }
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a transition and returns its sample index.
    pub fn store(&mut self, tr: T) -> Result<usize, PerError> {
        match self {
            Self::Uniform(b) => Ok(b.store(tr)),
            Self::Prioritized(b) => b.store(tr),
        }
    }

    /// Samples `n` transitions.
    pub fn sample(&mut self, n: usize) -> Result<TransitionBatch<T>, PerError> {
        match self {
            Self::Uniform(b) => b.sample(n),
            Self::Prioritized(b) => b.sample(n),
        }
    }

    /// Updates priorities of sampled transitions. No-op for the uniform variant.
    pub fn update_priorities(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<(), PerError> {
        match self {
            Self::Uniform(b) => b.update_priorities(ixs, td_errs),
            Self::Prioritized(b) => b.update_priorities(ixs, td_errs),
        }
    }
}

impl<T: Clone> ExperienceBufferBase for ReplayBuffer<T> {
    type Item = T;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.store(tr)?;
        Ok(())
    }

    fn len(&self) -> usize {
        match self {
            Self::Uniform(b) => b.len(),
            Self::Prioritized(b) => b.len(),
        }
    }
}

impl<T: Clone> ReplayBufferBase for ReplayBuffer<T> {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch<T>;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(match &config.per_config {
            Some(per_config) => Self::Prioritized(PrioritizedReplayBuffer::new(
                config.capacity,
                per_config,
                config.seed,
            )?),
            None => Self::Uniform(UniformReplayBuffer::new(config.capacity, config.seed)?),
        })
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }

    fn update_priority(&mut self, ixs: &[usize], td_errs: &[f32]) -> Result<()> {
        Ok(self.update_priorities(ixs, td_errs)?)
    }
}
