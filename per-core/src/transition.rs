//! Transition of an environment with a discrete action.
use crate::error::PerError;
use serde::{Deserialize, Serialize};

/// A transition `(o_t, a_t, r_t, o_t+1)`.
///
/// The buffers store any `Clone` record; this type covers the common case of
/// vector observations and a discrete action, and converts to and from a flat row
/// `[o_t.., a_t, r_t, o_t+1..]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Observation `o_t`.
    pub obs: Vec<f32>,

    /// Action `a_t`.
    pub act: i64,

    /// Reward `r_t`.
    pub reward: f32,

    /// Next observation `o_t+1`.
    pub next_obs: Vec<f32>,
}

impl Transition {
    /// Creates a transition.
    pub fn new(obs: Vec<f32>, act: i64, reward: f32, next_obs: Vec<f32>) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
        }
    }

    /// Width of the flat row of a transition with observations of dimension `obs_dim`.
    pub fn flat_width(obs_dim: usize) -> usize {
        2 * obs_dim + 2
    }

    /// Concatenates the transition into a row `[o_t.., a_t, r_t, o_t+1..]`.
    pub fn flatten(&self) -> Vec<f32> {
        let mut row = Vec::with_capacity(self.obs.len() + self.next_obs.len() + 2);
        row.extend_from_slice(&self.obs);
        row.push(self.act as f32);
        row.push(self.reward);
        row.extend_from_slice(&self.next_obs);
        row
    }

    /// Splits a row created by [`flatten`](Self::flatten).
    pub fn from_flat(row: &[f32], obs_dim: usize) -> Result<Self, PerError> {
        let expected = Self::flat_width(obs_dim);
        if row.len() != expected {
            return Err(PerError::InvalidRecordWidth {
                expected,
                actual: row.len(),
            });
        }

        Ok(Self {
            obs: row[..obs_dim].to_vec(),
            act: row[obs_dim] as i64,
            reward: row[obs_dim + 1],
            next_obs: row[obs_dim + 2..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Transition;
    use crate::error::PerError;

    #[test]
    fn test_flatten() {
        let tr = Transition::new(vec![0.1, 0.2], 3, -1.0, vec![0.3, 0.4]);
        let row = tr.flatten();
        assert_eq!(row, vec![0.1, 0.2, 3.0, -1.0, 0.3, 0.4]);
        assert_eq!(Transition::from_flat(&row, 2).unwrap(), tr);
        assert_eq!(
            Transition::from_flat(&row, 3).unwrap_err(),
            PerError::InvalidRecordWidth {
                expected: 8,
                actual: 6
            }
        );
    }
}
