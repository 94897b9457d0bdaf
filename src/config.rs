/*!
Run configuration for [`MetropolisSampler`](crate::metropolis::MetropolisSampler).

```rust
use mini_metropolis::config::MetropolisConfig;

let config = MetropolisConfig::new(50, 0.1).set_seed(42);
assert!(config.validate().is_ok());
assert!(MetropolisConfig::new(0, 0.1).validate().is_err());
```
*/

use num_traits::Float;
use rand::{thread_rng, Rng};

use crate::error::{MetropolisError, Result};

/// Number of proposals used by the textbook chapter.
pub const DEFAULT_NUM_PROPOSALS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetropolisConfig<T> {
    /// Iterations per run; one proposal record per iteration.
    pub num_proposals: usize,
    /// Standard deviation of the Gaussian noise added to each coordinate.
    pub step_size: T,
    /// Seed used by the seeded entry points.
    pub seed: u64,
}

impl<T: Float> MetropolisConfig<T> {
    /// Creates a configuration with a random seed, as the samplers in this crate do
    /// until [`set_seed`](Self::set_seed) is called.
    pub fn new(num_proposals: usize, step_size: T) -> Self {
        Self {
            num_proposals,
            step_size,
            seed: thread_rng().gen::<u64>(),
        }
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn set_num_proposals(mut self, num_proposals: usize) -> Self {
        self.num_proposals = num_proposals;
        self
    }

    pub fn set_step_size(mut self, step_size: T) -> Self {
        self.step_size = step_size;
        self
    }

    /// Checks `num_proposals >= 1` and `0 < step_size < inf`.
    pub fn validate(&self) -> Result<()> {
        if self.num_proposals < 1 {
            return Err(MetropolisError::invalid(format!(
                "num_proposals must be >= 1, got {}",
                self.num_proposals
            )));
        }
        // NaN fails the first comparison.
        if !(self.step_size > T::zero()) || !self.step_size.is_finite() {
            return Err(MetropolisError::invalid(format!(
                "step_size must be finite and > 0, got {}",
                self.step_size.to_f64().unwrap_or(f64::NAN)
            )));
        }
        Ok(())
    }
}

impl<T: Float> Default for MetropolisConfig<T> {
    fn default() -> Self {
        let step_size = T::from(0.1).unwrap_or_else(T::one);
        Self::new(DEFAULT_NUM_PROPOSALS, step_size)
    }
}
