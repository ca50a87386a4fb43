#![warn(missing_docs)]
//! Prioritized experience replay.
//!
//! A [`PrioritySumTree`](replay_buffer::PrioritySumTree) keeps the priorities of stored
//! transitions so that updates and weighted draws are `O(log n)`.
//! [`PrioritizedReplayBuffer`](replay_buffer::PrioritizedReplayBuffer) builds on it,
//! mapping errors reported by a learner to priorities and computing importance
//! sampling weights for the transitions it samples.
pub mod error;
pub mod replay_buffer;
pub mod transition;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};
pub use error::PerError;
pub use transition::Transition;
