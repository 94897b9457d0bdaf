/*!
Chain abstraction and helpers for running several independent chains at once.

A single Metropolis run is strictly sequential, but independent runs share nothing
and can be executed in parallel. [`run_chains`] does exactly that on the rayon
thread pool. Chain `i` is seeded with `seed + i`, so the whole batch is
reproducible.

```rust
use mini_metropolis::config::MetropolisConfig;
use mini_metropolis::core::run_chains;
use mini_metropolis::distributions::IsotropicGaussian;
use mini_metropolis::metropolis::MetropolisSampler;

let target = IsotropicGaussian::new(1.0).unwrap();
let sampler = MetropolisSampler::new(MetropolisConfig::new(500, 1.0)).unwrap();
let starts = vec![vec![-1.0, 1.0], vec![1.0, -1.0], vec![0.0, 0.0]];

let runs = run_chains(&sampler, &target, &starts, 42).unwrap();
assert_eq!(runs.len(), 3);
assert!(runs.iter().all(|r| r.num_proposals() == 500));
```
*/

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use num_traits::Float;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Standard, StandardNormal};
use rayon::prelude::*;

use crate::error::Result;
use crate::distributions::Target;
use crate::metropolis::{MetropolisSampler, ProposalRecord, RunResult};

pub trait MarkovChain<T> {
    /// Does one iteration of the chain and reports what was proposed.
    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<ProposalRecord<T>>;

    /// The current state, without stepping.
    fn current_state(&self) -> &[T];
}

/// Seed of chain `index` in a batch seeded with `seed`.
pub fn chain_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

/// Runs one chain per starting point in parallel.
///
/// Results come back in the order of `starting_points`. If any chain fails, the
/// whole batch fails with one of the errors.
pub fn run_chains<T, D>(
    sampler: &MetropolisSampler<T>,
    target: &D,
    starting_points: &[Vec<T>],
    seed: u64,
) -> Result<Vec<RunResult<T>>>
where
    T: Float + Send + Sync,
    D: Target<T> + Sync + ?Sized,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    starting_points
        .par_iter()
        .enumerate()
        .map(|(i, start)| {
            let mut rng = SmallRng::seed_from_u64(chain_seed(seed, i));
            sampler.run(target, start, &mut rng)
        })
        .collect()
}

/// Same as [`run_chains`], with one progress bar per chain.
pub fn run_chains_progress<T, D>(
    sampler: &MetropolisSampler<T>,
    target: &D,
    starting_points: &[Vec<T>],
    seed: u64,
) -> Result<Vec<RunResult<T>>>
where
    T: Float + Send + Sync,
    D: Target<T> + Sync + ?Sized,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    let multi = MultiProgress::new();
    let pb_style = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    let n_steps = sampler.config().num_proposals as u64;

    starting_points
        .par_iter()
        .enumerate()
        .map(|(i, start)| {
            let pb = multi.add(ProgressBar::new(n_steps));
            pb.set_prefix(format!("Chain {i}"));
            pb.set_style(pb_style.clone());

            let mut rng = SmallRng::seed_from_u64(chain_seed(seed, i));
            let result = sampler.run_progress(target, start, &mut rng, &pb);
            match &result {
                Ok(_) => pb.finish_with_message("Done!"),
                Err(e) => pb.abandon_with_message(format!("Failed: {e}")),
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetropolisConfig;
    use crate::distributions::{Gaussian2D, TryDensityFn};
    use crate::error::MetropolisError;

    fn sampler() -> MetropolisSampler<f64> {
        MetropolisSampler::new(MetropolisConfig::new(200, 0.25)).unwrap()
    }

    #[test]
    fn chains_match_sequential_runs() {
        let target = Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9).unwrap();
        let starts = vec![vec![-1.0, 1.0], vec![1.0, -1.0]];
        let parallel = run_chains(&sampler(), &target, &starts, 7).unwrap();

        for (i, start) in starts.iter().enumerate() {
            let mut rng = SmallRng::seed_from_u64(7 + i as u64);
            let sequential = sampler().run(&target, start, &mut rng).unwrap();
            assert_eq!(parallel[i], sequential);
        }
    }

    #[test]
    fn progress_variant_matches_plain() {
        let target = Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9).unwrap();
        let starts = vec![vec![-1.0, 1.0]; 3];
        let plain = run_chains(&sampler(), &target, &starts, 1).unwrap();
        let with_bars = run_chains_progress(&sampler(), &target, &starts, 1).unwrap();
        assert_eq!(plain, with_bars);
        // Same start, different seeds: the chains differ.
        assert_ne!(plain[0], plain[1]);
    }

    #[test]
    fn one_failing_chain_fails_the_batch() {
        let target = TryDensityFn(|x: &[f64]| {
            if x[0] > 100.0 {
                Err("never reached from the good start")
            } else if x[0] < -100.0 {
                Ok(0.0)
            } else {
                Ok(1.0)
            }
        });
        let starts = vec![vec![0.0], vec![-200.0]];
        let err = run_chains(&sampler(), &target, &starts, 0).unwrap_err();
        assert!(matches!(err, MetropolisError::DegenerateDensity { .. }));
    }

    #[test]
    fn chain_seeds_do_not_overflow() {
        assert_eq!(chain_seed(u64::MAX, 1), 0);
        assert_eq!(chain_seed(42, 3), 45);
    }
}
