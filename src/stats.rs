//! Summaries of finished runs: moments of the realized path, the mean of accepted
//! moves, and the Gelman–Rubin R-hat across chains.

use ndarray::prelude::*;
use ndarray_stats::CorrelationExt;
use num_traits::Float;
use std::error::Error;

use crate::metropolis::RunResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ChainStats {
    pub n: u64,
    pub p_accept: f64,
    pub mean: Array1<f64>, // n_params
    pub sm2: Array1<f64>,  // n_params, unbiased variance
}

impl ChainStats {
    /// Moments of the realized path of `run` (chain position after every iteration).
    pub fn from_run<T: Float>(run: &RunResult<T>) -> Result<Self, Box<dyn Error>> {
        let path = path_f64(run);
        if path.nrows() < 2 {
            return Err("Expected at least 2 iterations to estimate a variance.".into());
        }
        let mean = path
            .mean_axis(Axis(0))
            .ok_or("Mean over iterations failed.")?;
        let sm2 = path.var_axis(Axis(0), 1.0);
        Ok(Self {
            n: path.nrows() as u64,
            p_accept: run.acceptance_rate(),
            mean,
            sm2,
        })
    }
}

fn path_f64<T: Float>(run: &RunResult<T>) -> Array2<f64> {
    run.path().mapv(|x| x.to_f64().unwrap_or(f64::NAN))
}

/// Mean of the accepted candidates, or `None` if the chain never moved.
pub fn accepted_mean<T: Float>(run: &RunResult<T>) -> Option<Array1<f64>> {
    let mut sum = Array1::<f64>::zeros(run.dim());
    let mut count = 0usize;
    for point in run.accepted_points() {
        sum.zip_mut_with(&ArrayView1::from(point), |s, &x| {
            *s += x.to_f64().unwrap_or(f64::NAN)
        });
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Sample covariance (`n_params x n_params`) of the realized path.
pub fn path_cov<T: Float>(run: &RunResult<T>) -> Result<Array2<f64>, Box<dyn Error>> {
    let path = path_f64(run);
    if path.nrows() < 2 {
        return Err("Expected at least 2 iterations to estimate a covariance.".into());
    }
    Ok(path.t().cov(1.0)?)
}

/// Potential scale reduction factor per parameter, from per-chain statistics.
///
/// Values close to 1 indicate that the chains agree.
pub fn rhat(all_chain_stats: &[ChainStats]) -> Result<Array1<f64>, Box<dyn Error>> {
    if all_chain_stats.len() < 2 {
        return Err("Expected at least 2 chains to compute R-hat.".into());
    }
    let means: Vec<ArrayView1<f64>> = all_chain_stats.iter().map(|x| x.mean.view()).collect();
    let means = ndarray::stack(Axis(0), &means)?;
    let sm2s: Vec<ArrayView1<f64>> = all_chain_stats.iter().map(|x| x.sm2.view()).collect();
    let sm2s = ndarray::stack(Axis(0), &sm2s)?;

    let w = sm2s
        .mean_axis(Axis(0))
        .ok_or("Computing within-chain variances failed.")?;
    // Between-chain variance of the means, i.e. B / n.
    let b_over_n = means.var_axis(Axis(0), 1.0);

    let n: f64 =
        all_chain_stats.iter().map(|x| x.n as f64).sum::<f64>() / all_chain_stats.len() as f64;
    Ok(((&w * ((n - 1.0) / n) + b_over_n) / &w).mapv(f64::sqrt))
}
