//! Batch of sampled transitions.

/// Transitions sampled from a replay buffer.
///
/// `ix_sample` are opaque handles to be passed back unmodified to
/// [`update_priority`](crate::ReplayBufferBase::update_priority): leaf indices of the
/// sum tree for a prioritized buffer, slot indices for a uniform one.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionBatch<T> {
    /// Sampled transitions.
    pub transitions: Vec<T>,

    /// Indices of sampled transitions.
    pub ix_sample: Vec<usize>,

    /// Importance sampling weights, `None` for uniform sampling.
    pub weight: Option<Vec<f32>>,
}

impl<T> TransitionBatch<T> {
    /// Creates an empty batch with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(capacity),
            ix_sample: Vec::with_capacity(capacity),
            weight: None,
        }
    }

    /// Decomposes the batch into transitions, sample indices and weights.
    pub fn unpack(self) -> (Vec<T>, Vec<usize>, Option<Vec<f32>>) {
        (self.transitions, self.ix_sample, self.weight)
    }

    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if the batch has no transitions.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
