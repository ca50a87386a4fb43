//! Configuration of replay buffers.
//!
//! This module provides configuration structures for the replay buffer, including:
//! - Basic buffer configuration (capacity, seed)
//! - Prioritized Experience Replay (PER) configuration
//! - Loading and saving in YAML
use crate::error::PerError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration for Prioritized Experience Replay (PER).
///
/// # Examples
///
/// ```rust
/// use per_core::replay_buffer::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_0(0.4)
///     .beta_increment(0.001)
///     .epsilon(0.01)
///     .abs_err_upper(1.0);
/// assert_eq!(config.beta_final, 1.0);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent for prioritization. A value of 0 results in uniform sampling.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Amount added to the importance sampling exponent each time a batch is sampled.
    pub beta_increment: f32,

    /// Upper bound of the importance sampling exponent.
    pub beta_final: f32,

    /// Small positive value added to absolute errors so that no transition
    /// gets exactly zero priority.
    pub epsilon: f32,

    /// Upper clip of absolute errors before the power transform. Also the priority
    /// given to the first transitions stored in an empty buffer.
    pub abs_err_upper: f32,
}

impl Default for PerConfig {
    /// Creates a default PER configuration:
    /// - `alpha = 0.6`
    /// - `beta_0 = 0.4`
    /// - `beta_increment = 0.001`
    /// - `beta_final = 1.0`
    /// - `epsilon = 0.01`
    /// - `abs_err_upper = 1.0`
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_increment: 0.001,
            beta_final: 1.0,
            epsilon: 0.01,
            abs_err_upper: 1.0,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the increment of the importance sampling exponent per sampling.
    pub fn beta_increment(mut self, beta_increment: f32) -> Self {
        self.beta_increment = beta_increment;
        self
    }

    /// Sets the final importance sampling exponent `beta_final`.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the priority floor `epsilon`.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the upper clip of absolute errors.
    pub fn abs_err_upper(mut self, abs_err_upper: f32) -> Self {
        self.abs_err_upper = abs_err_upper;
        self
    }

    /// Checks the range of every field.
    ///
    /// `alpha` must lie in `[0, 1]`, `epsilon` and `abs_err_upper` must be positive,
    /// `beta_0` and `beta_increment` non-negative and `beta_final >= beta_0`.
    /// With a non-positive `abs_err_upper` every stored transition would get zero
    /// priority and the buffer could never be sampled.
    pub fn validate(&self) -> Result<(), PerError> {
        let invalid = |name: &'static str, value: f32| -> Result<(), PerError> {
            Err(PerError::InvalidConfig { name, value })
        };

        if !(0.0..=1.0).contains(&self.alpha) {
            return invalid("alpha", self.alpha);
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return invalid("epsilon", self.epsilon);
        }
        if !(self.abs_err_upper > 0.0 && self.abs_err_upper.is_finite()) {
            return invalid("abs_err_upper", self.abs_err_upper);
        }
        if !(self.beta_0 >= 0.0 && self.beta_0.is_finite()) {
            return invalid("beta_0", self.beta_0);
        }
        if !(self.beta_increment >= 0.0 && self.beta_increment.is_finite()) {
            return invalid("beta_increment", self.beta_increment);
        }
        if !(self.beta_final >= self.beta_0 && self.beta_final.is_finite()) {
            return invalid("beta_final", self.beta_final);
        }
        Ok(())
    }
}

/// Configuration for the replay buffer.
///
/// When `per_config` is `None` a uniform replay buffer is built.
///
/// # Examples
///
/// ```rust
/// use per_core::replay_buffer::{PerConfig, ReplayBufferConfig};
///
/// // Uniform sampling
/// let config = ReplayBufferConfig::default()
///     .capacity(10000)
///     .seed(42);
///
/// // Prioritized sampling
/// let config_with_per = ReplayBufferConfig::default()
///     .capacity(10000)
///     .seed(42)
///     .per_config(Some(PerConfig::default()));
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    /// When the buffer is full, new transitions replace the oldest ones.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Optional configuration for prioritized experience replay. If `None`,
    /// transitions are sampled uniformly at random.
    pub per_config: Option<PerConfig>,
}

impl Default for ReplayBufferConfig {
    /// Creates a default replay buffer configuration:
    /// - `capacity = 10000`
    /// - `seed = 1`
    /// - `per_config = None`
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 1,
            per_config: None,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration for prioritized experience replay.
    pub fn per_config(mut self, per_config: Option<PerConfig>) -> Self {
        self.per_config = per_config;
        self
    }

    /// Loads the configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
