//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum PerError {
    /// The capacity of a buffer or a sum tree must be positive.
    #[error("Capacity must be positive, got {0}")]
    InvalidCapacity(usize),

    /// A batch with no samples was requested.
    #[error("Batch size must be positive")]
    EmptyBatch,

    /// More samples than slots were requested.
    #[error("Batch size {batch_size} exceeds capacity {capacity}")]
    BatchSizeExceedsCapacity {
        /// Requested number of samples.
        batch_size: usize,
        /// Number of slots in the buffer.
        capacity: usize,
    },

    /// The priority distribution has no mass, e.g., nothing has been stored yet.
    #[error("Total priority is zero, store transitions before sampling")]
    ZeroTotalPriority,

    /// Indices and errors given to a batch update differ in length.
    #[error("Got {n_ixs} indices but {n_errs} errors")]
    LengthMismatch {
        /// Number of indices.
        n_ixs: usize,
        /// Number of errors.
        n_errs: usize,
    },

    /// The index does not point to a leaf of the sum tree.
    #[error("Index {ix} is not a leaf of a sum tree with capacity {capacity}")]
    InvalidLeafIndex {
        /// The offending index.
        ix: usize,
        /// Capacity of the sum tree.
        capacity: usize,
    },

    /// Priorities must be finite and non-negative.
    #[error("Invalid priority: {0}")]
    InvalidPriority(f32),

    /// The slot behind a leaf has never been written.
    #[error("Slot {0} holds no record")]
    EmptySlot(usize),

    /// A field of a prioritized replay configuration is out of its range.
    #[error("Invalid value of {name} in the PER config: {value}")]
    InvalidConfig {
        /// Name of the field.
        name: &'static str,
        /// The offending value.
        value: f32,
    },

    /// A flat record does not have the width of a transition.
    #[error("Expected a record of width {expected}, got {actual}")]
    InvalidRecordWidth {
        /// Expected width.
        expected: usize,
        /// Actual width.
        actual: usize,
    },
}
