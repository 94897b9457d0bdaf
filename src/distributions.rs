/*!
Target densities and the isotropic Gaussian random-walk proposal.

A target is anything implementing [`Target`]: it maps a point to its unnormalized
log density, with `-inf` standing for zero density. Plain Rust closures can be used
through the [`DensityFn`], [`LogDensityFn`] and [`TryDensityFn`] adapters.

# Examples

```rust
use mini_metropolis::distributions::{DensityFn, Gaussian2D, Target};

// The correlated target from the textbook chapter.
let target = Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9).unwrap();
assert!(target.log_density(&[0.0, 0.0]).unwrap() > target.log_density(&[-1.0, 1.0]).unwrap());

// A flat density, written as a closure.
let flat = DensityFn(|_: &[f64]| 1.0);
assert_eq!(flat.log_density(&[3.0, -2.0]).unwrap(), 0.0);
```
*/

use ndarray::{arr1, arr2, Array1, Array2};
use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use std::f64::consts::PI;

use crate::error::{MetropolisError, Result, TargetError};

/// A density known up to a normalizing constant.
pub trait Target<T: Float> {
    /// Log of the unnormalized density at `point`. Zero density is `-inf`.
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError>;

    /// Dimension of the parameter space, if the target fixes one.
    fn dim(&self) -> Option<usize> {
        None
    }
}

impl<T: Float, D: Target<T> + ?Sized> Target<T> for &D {
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError> {
        (**self).log_density(point)
    }

    fn dim(&self) -> Option<usize> {
        (**self).dim()
    }
}

/// Densities whose normalizing constant is known, so `log_prob` is a true log pdf.
///
/// Points the density cannot be evaluated at give NaN.
pub trait Normalized<T: Float> {
    fn log_prob(&self, point: &[T]) -> T;
}

/// Wraps a closure returning a (non-negative) density.
///
/// Negative values come back as a NaN log density, which the sampler treats as a
/// broken target.
#[derive(Debug, Clone, Copy)]
pub struct DensityFn<F>(pub F);

impl<T: Float, F: Fn(&[T]) -> T> Target<T> for DensityFn<F> {
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError> {
        Ok((self.0)(point).ln())
    }
}

/// Wraps a closure that already returns a log density.
#[derive(Debug, Clone, Copy)]
pub struct LogDensityFn<F>(pub F);

impl<T: Float, F: Fn(&[T]) -> T> Target<T> for LogDensityFn<F> {
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError> {
        Ok((self.0)(point))
    }
}

/// Wraps a fallible closure returning a density. Its errors abort the run.
#[derive(Debug, Clone, Copy)]
pub struct TryDensityFn<F>(pub F);

impl<T, F, E> Target<T> for TryDensityFn<F>
where
    T: Float,
    F: Fn(&[T]) -> std::result::Result<T, E>,
    E: Into<TargetError>,
{
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError> {
        (self.0)(point).map(|p| p.ln()).map_err(Into::into)
    }
}

/**
A 2D Gaussian distribution parameterized by a mean vector and a 2×2 covariance matrix.

# Examples

```rust
use mini_metropolis::distributions::{Gaussian2D, Normalized};
use ndarray::{arr1, arr2};

let gauss = Gaussian2D {
    mean: arr1(&[0.0, 0.0]),
    cov: arr2(&[[1.0, 0.0], [0.0, 1.0]]),
};
let lp = gauss.log_prob(&[0.0, 0.0]);
assert!((lp + (2.0 * std::f64::consts::PI).ln()).abs() < 1e-12);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian2D<T: Float> {
    pub mean: Array1<T>,
    pub cov: Array2<T>,
}

impl<T: Float> Gaussian2D<T> {
    /// Builds the Gaussian with standard deviations `sd` and correlation `rho`.
    pub fn correlated(mean: [T; 2], sd: [T; 2], rho: T) -> Result<Self> {
        if !(sd[0] > T::zero() && sd[1] > T::zero()) {
            return Err(MetropolisError::invalid(
                "standard deviations must be > 0",
            ));
        }
        if !(rho.abs() < T::one()) {
            return Err(MetropolisError::invalid("correlation must lie in (-1, 1)"));
        }
        let off = rho * sd[0] * sd[1];
        Ok(Self {
            mean: arr1(&mean),
            cov: arr2(&[[sd[0] * sd[0], off], [off, sd[1] * sd[1]]]),
        })
    }

    /// Public fields can be set to any shape; only 2 and 2×2 are usable.
    fn check_shape(&self) -> std::result::Result<(), TargetError> {
        if self.mean.len() != 2 || self.cov.dim() != (2, 2) {
            return Err(format!(
                "Gaussian2D needs a mean of length 2 and a 2x2 covariance, got {} and {:?}",
                self.mean.len(),
                self.cov.dim()
            )
            .into());
        }
        Ok(())
    }

    fn det(&self) -> T {
        self.cov[(0, 0)] * self.cov[(1, 1)] - self.cov[(0, 1)] * self.cov[(1, 0)]
    }

    /// (x - mu)^T Sigma^{-1} (x - mu), using the closed-form 2×2 inverse.
    fn mahalanobis_sq(&self, x: T, y: T) -> T {
        let (a, b, c, d) = (
            self.cov[(0, 0)],
            self.cov[(0, 1)],
            self.cov[(1, 0)],
            self.cov[(1, 1)],
        );
        let dx = x - self.mean[0];
        let dy = y - self.mean[1];
        (d * dx * dx - (b + c) * dx * dy + a * dy * dy) / self.det()
    }
}

impl<T: Float> Target<T> for Gaussian2D<T> {
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError> {
        self.check_shape()?;
        match point {
            [x, y] => {
                let half = T::from(0.5).ok_or("cannot represent 0.5")?;
                Ok(-half * self.mahalanobis_sq(*x, *y))
            }
            _ => Err(format!("Gaussian2D expects 2 coordinates, got {}", point.len()).into()),
        }
    }

    fn dim(&self) -> Option<usize> {
        Some(2)
    }
}

impl<T: Float> Normalized<T> for Gaussian2D<T> {
    /// Computes the fully normalized log-density of a 2D Gaussian.
    fn log_prob(&self, point: &[T]) -> T {
        match point {
            [x, y] if self.check_shape().is_ok() => {
                let half = T::from(0.5).unwrap_or_else(T::zero);
                let two_pi = T::from(2.0 * PI).unwrap_or_else(T::zero);
                -two_pi.ln()
                    - half * self.det().abs().ln()
                    - half * self.mahalanobis_sq(*x, *y)
            }
            _ => T::nan(),
        }
    }
}

/**
An isotropic Gaussian with mean 0 and standard deviation `std` in every coordinate.

As a proposal it adds independent `N(0, std)` noise to each coordinate of the current
state. Because that kernel is symmetric, `log_prob(a, b) == log_prob(b, a)` and the
Metropolis acceptance ratio needs no correction term. As a [`Target`] it is the
centred density `exp(-|x|^2 / (2 std^2))`.

```rust
use mini_metropolis::distributions::IsotropicGaussian;
use rand::{rngs::SmallRng, SeedableRng};

let proposal = IsotropicGaussian::new(0.25).unwrap();
let mut rng = SmallRng::seed_from_u64(42);
let candidate = proposal.propose(&[-1.0, 1.0], &mut rng);
assert_eq!(candidate.len(), 2);
assert_eq!(
    proposal.log_prob(&[-1.0, 1.0], &candidate),
    proposal.log_prob(&candidate, &[-1.0, 1.0])
);
```
*/
#[derive(Debug, Clone, Copy)]
pub struct IsotropicGaussian<T: Float>
where
    StandardNormal: Distribution<T>,
{
    pub std: T,
    noise: Normal<T>,
}

impl<T: Float> IsotropicGaussian<T>
where
    StandardNormal: Distribution<T>,
{
    /// Fails unless `std` is finite and positive.
    pub fn new(std: T) -> Result<Self> {
        if !(std > T::zero()) || !std.is_finite() {
            return Err(MetropolisError::invalid(format!(
                "standard deviation must be finite and > 0, got {}",
                std.to_f64().unwrap_or(f64::NAN)
            )));
        }
        let noise = Normal::new(T::zero(), std)
            .map_err(|e| MetropolisError::invalid(format!("bad proposal scale: {e}")))?;
        Ok(Self { std, noise })
    }

    /// Draws one noise value per coordinate, in coordinate order.
    pub fn propose<R: Rng + ?Sized>(&self, current: &[T], rng: &mut R) -> Vec<T> {
        current.iter().map(|&x| x + self.noise.sample(rng)).collect()
    }

    /// Evaluates log q(to | from).
    pub fn log_prob(&self, from: &[T], to: &[T]) -> T {
        let two = T::one() + T::one();
        let var = self.std * self.std;
        let d = T::from(from.len()).unwrap_or_else(T::zero);
        let two_pi = T::from(2.0 * PI).unwrap_or_else(T::zero);
        let sq: T = from
            .iter()
            .zip(to)
            .fold(T::zero(), |acc, (&f, &t)| acc + (t - f) * (t - f));
        -sq / (two * var) - d / two * (two_pi * var).ln()
    }
}

impl<T: Float> Target<T> for IsotropicGaussian<T>
where
    StandardNormal: Distribution<T>,
{
    fn log_density(&self, point: &[T]) -> std::result::Result<T, TargetError> {
        let two = T::one() + T::one();
        let sq = point.iter().fold(T::zero(), |acc, &x| acc + x * x);
        Ok(-sq / (two * self.std * self.std))
    }
}

impl<T: Float> Normalized<T> for IsotropicGaussian<T>
where
    StandardNormal: Distribution<T>,
{
    fn log_prob(&self, point: &[T]) -> T {
        let zeros = vec![T::zero(); point.len()];
        IsotropicGaussian::log_prob(self, &zeros, point)
    }
}
