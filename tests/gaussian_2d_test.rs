//! Checks that pooled parallel chains reproduce the moments of a 2D Gaussian, and
//! that chains run against the wrong target visibly do not.

use mini_metropolis::config::MetropolisConfig;
use mini_metropolis::core::run_chains;
use mini_metropolis::distributions::Gaussian2D;
use mini_metropolis::metropolis::{MetropolisSampler, RunResult};
use mini_metropolis::stats::{rhat, ChainStats};
use ndarray::{arr1, arr2, concatenate, Array2, Axis};
use ndarray_stats::CorrelationExt;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE_SIZE: usize = 10_000;
    const BURNIN: usize = 2_500;
    const N_CHAINS: usize = 4;
    const SEED: u64 = 42;

    fn true_target() -> Gaussian2D<f64> {
        Gaussian2D {
            mean: arr1(&[0.0, 0.0]),
            cov: arr2(&[[4.0, 2.0], [2.0, 3.0]]),
        }
    }

    /// Runs `N_CHAINS` chains from far-away starts and pools the paths, burn-in removed.
    fn pooled_samples(target: &Gaussian2D<f64>) -> (Array2<f64>, Vec<RunResult<f64>>) {
        let sampler =
            MetropolisSampler::new(MetropolisConfig::new(BURNIN + SAMPLE_SIZE, 1.0)).unwrap();
        let starts: Vec<Vec<f64>> = (0..N_CHAINS)
            .map(|i| vec![10.0 - 5.0 * i as f64, 12.0 - 6.0 * i as f64])
            .collect();
        let runs = run_chains(&sampler, target, &starts, SEED).unwrap();

        let paths: Vec<Array2<f64>> = runs
            .iter()
            .map(|r| r.path().slice_axis(Axis(0), (BURNIN..).into()).to_owned())
            .collect();
        let views: Vec<_> = paths.iter().map(|p| p.view()).collect();
        (concatenate(Axis(0), &views).unwrap(), runs)
    }

    #[test]
    fn test_two_d_gaussian_accept() {
        let target = true_target();
        let (samples, runs) = pooled_samples(&target);
        assert_eq!(samples.nrows(), N_CHAINS * SAMPLE_SIZE);

        let mean = samples.mean_axis(Axis(0)).unwrap();
        let cov = samples.t().cov(1.0).unwrap();
        assert_abs_diff_eq!(mean, target.mean, epsilon = 0.5);
        assert_abs_diff_eq!(cov, target.cov, epsilon = 0.5);

        let stats: Vec<ChainStats> = runs
            .iter()
            .map(|r| ChainStats::from_run(r).unwrap())
            .collect();
        let rhat = rhat(&stats).unwrap();
        assert!(rhat.iter().all(|&r| r < 1.1), "R-hat too large: {rhat}");
    }

    #[test]
    fn test_two_d_gaussian_reject() {
        let false_target = Gaussian2D {
            mean: arr1(&[0.0, 0.0]),
            cov: arr2(&[[1.0, 0.0], [0.0, 1.0]]),
        };
        let (samples, _) = pooled_samples(&false_target);

        let cov = samples.t().cov(1.0).unwrap();
        let max_diff = (&true_target().cov - &cov)
            .iter()
            .fold(0.0f64, |m, d| m.max(d.abs()));
        assert!(
            max_diff > 1.0,
            "Covariance of false target samples is unexpectedly close to true target covariance. max_diff: {}",
            max_diff
        );
    }
}
