//! Scheduling the exponent of importance weight for PER.
use serde::{Deserialize, Serialize};

/// Scheduler of the exponent of importance weight for PER.
///
/// $\beta$ starts at `beta_0` and grows by `beta_increment` every time a batch is
/// sampled, until it reaches `beta_final`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Increment of $\beta$ per sampling.
    pub beta_increment: f32,

    /// Final value of $\beta$.
    pub beta_final: f32,

    /// Current value of $\beta$.
    beta: f32,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_increment: f32, beta_final: f32) -> Self {
        Self {
            beta_0,
            beta_increment,
            beta_final,
            beta: beta_0.min(beta_final),
        }
    }

    /// Gets the exponents of importance sampling weight.
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Advances $\beta$ by one increment, clamped at `beta_final`, and returns it.
    pub fn step(&mut self) -> f32 {
        self.beta = (self.beta + self.beta_increment).min(self.beta_final);
        self.beta
    }

    /// Returns `true` once $\beta$ has reached its final value.
    pub fn is_annealed(&self) -> bool {
        self.beta >= self.beta_final
    }
}
