/*!
# Random-walk Metropolis sampler

[`MetropolisSampler`] draws from a target density known only up to a normalizing
constant. Each iteration perturbs every coordinate of the current position with
independent `N(0, step_size)` noise, then accepts the candidate with probability
`min(1, p(candidate) / p(current))`. The Gaussian kernel is symmetric, so no
Hastings correction enters the ratio.

Unlike a sampler that only returns the chain's path, every run keeps one
[`ProposalRecord`] per iteration, including rejected candidates, so the proposal
behaviour can be inspected afterwards.

## Randomness

The random source is owned by the caller and passed to [`MetropolisSampler::run`].
Per iteration the sampler consumes, in this order, one Gaussian draw per coordinate
and one uniform draw in `[0, 1)`. The same generator state and inputs therefore
always reproduce the same trace.

## Example

```rust
use mini_metropolis::config::MetropolisConfig;
use mini_metropolis::distributions::Gaussian2D;
use mini_metropolis::metropolis::MetropolisSampler;
use rand::{rngs::SmallRng, SeedableRng};

let target = Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9).unwrap();
let sampler = MetropolisSampler::new(MetropolisConfig::new(50, 0.1)).unwrap();

let mut rng = SmallRng::seed_from_u64(42);
let result = sampler.run(&target, &[-1.0, 1.0], &mut rng).unwrap();

assert_eq!(result.records().len(), 50);
assert!((0.0..=1.0).contains(&result.acceptance_rate()));
```
*/

use indicatif::ProgressBar;
use log::{debug, warn};
use ndarray::{Array2, ArrayView1};
use num_traits::Float;
use rand::prelude::*;
use rand_distr::{Standard, StandardNormal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::MetropolisConfig;
use crate::core::MarkovChain;
use crate::distributions::{IsotropicGaussian, Target};
use crate::error::{MetropolisError, Result};

/// Runs shorter than this are too noisy to warn about their acceptance rate.
const MIN_PROPOSALS_FOR_RATE_WARNING: usize = 20;

/// One iteration of a run: the candidate that was evaluated and whether the chain
/// moved to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRecord<T> {
    pub candidate: Vec<T>,
    pub accepted: bool,
}

/// The complete trace of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult<T> {
    records: Vec<ProposalRecord<T>>,
    acceptance_rate: f64,
    start: Vec<T>,
    final_state: Vec<T>,
}

impl<T: Float> RunResult<T> {
    fn new(records: Vec<ProposalRecord<T>>, start: Vec<T>, final_state: Vec<T>) -> Self {
        let n_accepted = records.iter().filter(|r| r.accepted).count();
        let acceptance_rate = if records.is_empty() {
            0.0
        } else {
            n_accepted as f64 / records.len() as f64
        };
        Self {
            records,
            acceptance_rate,
            start,
            final_state,
        }
    }

    /// Proposal records in iteration order.
    pub fn records(&self) -> &[ProposalRecord<T>] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProposalRecord<T>> {
        self.records
    }

    /// Accepted moves divided by iterations.
    pub fn acceptance_rate(&self) -> f64 {
        self.acceptance_rate
    }

    pub fn n_accepted(&self) -> usize {
        self.records.iter().filter(|r| r.accepted).count()
    }

    pub fn num_proposals(&self) -> usize {
        self.records.len()
    }

    pub fn dim(&self) -> usize {
        self.start.len()
    }

    pub fn start(&self) -> &[T] {
        &self.start
    }

    /// Chain position after the last iteration.
    pub fn final_state(&self) -> &[T] {
        &self.final_state
    }

    /// Accepted candidates in the order the chain visited them.
    pub fn accepted_points(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.records
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.candidate.as_slice())
    }

    /// The realized chain: row `i` is the chain position after iteration `i`.
    pub fn path(&self) -> Array2<T> {
        let mut path = Array2::<T>::zeros((self.records.len(), self.dim()));
        let mut current = self.start.as_slice();
        for (i, record) in self.records.iter().enumerate() {
            if record.accepted {
                current = &record.candidate;
            }
            path.row_mut(i).assign(&ArrayView1::from(current));
        }
        path
    }
}

/**
A single random-walk Metropolis chain bound to one target.

Holds the chain state (position, its log density and the accepted count). A chain
is created by [`MetropolisSampler`] for each run and dropped when the run ends, but
it can also be driven by hand through [`MarkovChain::step`].

```rust
use mini_metropolis::core::MarkovChain;
use mini_metropolis::distributions::{IsotropicGaussian, Gaussian2D};
use mini_metropolis::metropolis::MetropolisChain;
use rand::{rngs::SmallRng, SeedableRng};

let target = Gaussian2D::correlated([0.0, 0.0], [1.0, 1.0], 0.5).unwrap();
let proposal = IsotropicGaussian::new(0.5).unwrap();
let mut chain = MetropolisChain::new(&target, proposal, &[0.0, 0.0]).unwrap();

let mut rng = SmallRng::seed_from_u64(1);
let record = chain.step(&mut rng).unwrap();
assert_eq!(record.candidate.len(), 2);
```
*/
#[derive(Debug)]
pub struct MetropolisChain<'a, T, D: ?Sized>
where
    T: Float,
    StandardNormal: Distribution<T>,
{
    target: &'a D,
    proposal: IsotropicGaussian<T>,
    current_state: Vec<T>,
    current_log_density: T,
    n_accepted: usize,
}

impl<'a, T, D> MetropolisChain<'a, T, D>
where
    T: Float,
    D: Target<T> + ?Sized,
    StandardNormal: Distribution<T>,
{
    /// Validates the starting point and evaluates the target there.
    ///
    /// Fails with [`MetropolisError::DegenerateDensity`] unless the starting density is
    /// strictly positive and finite.
    pub fn new(
        target: &'a D,
        proposal: IsotropicGaussian<T>,
        initial_state: &[T],
    ) -> Result<Self> {
        if initial_state.is_empty() {
            return Err(MetropolisError::invalid("starting point must not be empty"));
        }
        if let Some(expected) = target.dim() {
            if expected != initial_state.len() {
                return Err(MetropolisError::DimensionMismatch {
                    expected,
                    found: initial_state.len(),
                });
            }
        }
        let log_density = target.log_density(initial_state)?;
        if !log_density.is_finite() {
            return Err(MetropolisError::DegenerateDensity {
                log_density: log_density.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(Self {
            target,
            proposal,
            current_state: initial_state.to_vec(),
            current_log_density: log_density,
            n_accepted: 0,
        })
    }

    pub fn n_accepted(&self) -> usize {
        self.n_accepted
    }

    pub fn current_log_density(&self) -> T {
        self.current_log_density
    }
}

impl<T, D> MarkovChain<T> for MetropolisChain<'_, T, D>
where
    T: Float,
    D: Target<T> + ?Sized,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    /// Proposes one candidate and accepts it if `u < p(candidate) / p(current)`.
    ///
    /// The comparison is done in log space. A zero density at the current position
    /// counts as an infinite ratio, so the chain always moves away from it.
    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<ProposalRecord<T>> {
        let candidate = self.proposal.propose(&self.current_state, rng);
        let candidate_log_density = self.target.log_density(&candidate)?;
        if candidate_log_density.is_nan() || candidate_log_density == T::infinity() {
            return Err(MetropolisError::EvaluationFailure {
                source: format!(
                    "target returned log density {} at {:?}",
                    candidate_log_density.to_f64().unwrap_or(f64::NAN),
                    candidate
                        .iter()
                        .map(|x| x.to_f64().unwrap_or(f64::NAN))
                        .collect::<Vec<_>>()
                )
                .into(),
            });
        }

        let log_ratio = if self.current_log_density == T::neg_infinity() {
            T::infinity()
        } else {
            candidate_log_density - self.current_log_density
        };
        let u: T = rng.gen();
        let accepted = u.ln() < log_ratio;

        if accepted {
            self.current_state.clone_from(&candidate);
            self.current_log_density = candidate_log_density;
            self.n_accepted += 1;
        }
        Ok(ProposalRecord {
            candidate,
            accepted,
        })
    }

    fn current_state(&self) -> &[T] {
        &self.current_state
    }
}

/**
Runs random-walk Metropolis chains according to a validated [`MetropolisConfig`].

The sampler itself holds no chain state; every call to a `run*` method builds a
fresh chain, so one sampler can serve many runs, including concurrent ones (see
[`crate::core::run_chains`]).
*/
#[derive(Debug, Clone, Copy)]
pub struct MetropolisSampler<T>
where
    T: Float,
    StandardNormal: Distribution<T>,
{
    config: MetropolisConfig<T>,
    proposal: IsotropicGaussian<T>,
}

impl<T> MetropolisSampler<T>
where
    T: Float,
    StandardNormal: Distribution<T>,
    Standard: Distribution<T>,
{
    const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

    /// Fails with [`MetropolisError::InvalidConfiguration`] if the configuration is invalid.
    pub fn new(config: MetropolisConfig<T>) -> Result<Self> {
        config.validate()?;
        let proposal = IsotropicGaussian::new(config.step_size)?;
        Ok(Self { config, proposal })
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn config(&self) -> &MetropolisConfig<T> {
        &self.config
    }

    /// Runs one chain from `starting_point`, drawing all randomness from `rng`.
    ///
    /// Fails fast: any error aborts the run and no partial trace is returned.
    pub fn run<D, R>(&self, target: &D, starting_point: &[T], rng: &mut R) -> Result<RunResult<T>>
    where
        D: Target<T> + ?Sized,
        R: Rng + ?Sized,
    {
        self.drive(target, starting_point, rng, |_, _| Ok(()))
    }

    /// Like [`run`](Self::run), with a `SmallRng` seeded from the configured seed.
    pub fn run_seeded<D>(&self, target: &D, starting_point: &[T]) -> Result<RunResult<T>>
    where
        D: Target<T> + ?Sized,
    {
        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        self.run(target, starting_point, &mut rng)
    }

    /**
    Runs one chain while updating `pb`.

    The bar shows the running acceptance rate and is refreshed roughly every 500
    milliseconds, and once more when the run completes.
    */
    pub fn run_progress<D, R>(
        &self,
        target: &D,
        starting_point: &[T],
        rng: &mut R,
        pb: &ProgressBar,
    ) -> Result<RunResult<T>>
    where
        D: Target<T> + ?Sized,
        R: Rng + ?Sized,
    {
        let n = self.config.num_proposals;
        pb.set_length(n as u64);
        let mut last_update = Instant::now();

        let result = self.drive(target, starting_point, rng, |completed, accepted| {
            if completed > 0 && last_update.elapsed() >= Self::UPDATE_INTERVAL {
                pb.set_position(completed as u64);
                pb.set_message(format!(
                    "AcceptRate={:.3}",
                    accepted as f64 / completed as f64
                ));
                last_update = Instant::now();
            }
            Ok(())
        })?;

        pb.set_position(n as u64);
        pb.set_message(format!("AcceptRate={:.3}", result.acceptance_rate()));
        Ok(result)
    }

    /// Like [`run`](Self::run), but checks `cancel` before every iteration and fails
    /// with [`MetropolisError::Cancelled`] once it is set.
    pub fn run_cancellable<D, R>(
        &self,
        target: &D,
        starting_point: &[T],
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<RunResult<T>>
    where
        D: Target<T> + ?Sized,
        R: Rng + ?Sized,
    {
        let requested = self.config.num_proposals;
        self.drive(target, starting_point, rng, |completed, _| {
            if cancel.load(Ordering::Relaxed) {
                warn!("Metropolis run cancelled after {completed}/{requested} proposals");
                return Err(MetropolisError::Cancelled {
                    completed,
                    requested,
                });
            }
            Ok(())
        })
    }

    /// The sampling loop. `before_iteration(completed, accepted)` runs at every
    /// iteration boundary and may abort the run.
    fn drive<D, R, H>(
        &self,
        target: &D,
        starting_point: &[T],
        rng: &mut R,
        mut before_iteration: H,
    ) -> Result<RunResult<T>>
    where
        D: Target<T> + ?Sized,
        R: Rng + ?Sized,
        H: FnMut(usize, usize) -> Result<()>,
    {
        let n = self.config.num_proposals;
        let mut chain = MetropolisChain::new(target, self.proposal, starting_point)?;
        debug!(
            "Starting Metropolis run: {n} proposals, step size {}, dimension {}",
            self.config.step_size.to_f64().unwrap_or(f64::NAN),
            starting_point.len()
        );

        let mut records = Vec::with_capacity(n);
        for completed in 0..n {
            before_iteration(completed, chain.n_accepted())?;
            records.push(chain.step(rng)?);
        }

        let result = RunResult::new(records, starting_point.to_vec(), chain.current_state);
        debug!(
            "Finished Metropolis run: acceptance rate {:.3}",
            result.acceptance_rate()
        );
        if n >= MIN_PROPOSALS_FOR_RATE_WARNING
            && !(0.05..=0.95).contains(&result.acceptance_rate())
        {
            warn!(
                "Acceptance rate {:.3} over {n} proposals; consider changing the step size (currently {})",
                result.acceptance_rate(),
                self.config.step_size.to_f64().unwrap_or(f64::NAN)
            );
        }
        Ok(result)
    }
}
