//! Behavioural tests of the random-walk Metropolis sampler: reproducibility, trace
//! bookkeeping, acceptance behaviour and convergence on Gaussian targets.

use mini_metropolis::config::MetropolisConfig;
use mini_metropolis::distributions::{DensityFn, Gaussian2D, IsotropicGaussian};
use mini_metropolis::metropolis::MetropolisSampler;
use mini_metropolis::stats::accepted_mean;
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// The correlated Gaussian of the textbook chapter: sd 0.22, correlation -0.9.
    fn chapter_target() -> Gaussian2D<f64> {
        Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9).unwrap()
    }

    fn sampler(num_proposals: usize, step_size: f64) -> MetropolisSampler<f64> {
        MetropolisSampler::new(MetropolisConfig::new(num_proposals, step_size)).unwrap()
    }

    #[test]
    fn same_seed_same_trace() {
        let target = chapter_target();
        let s = sampler(500, 0.25);
        let a = s
            .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(42))
            .unwrap();
        let b = s
            .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);

        // The seeded entry point is equally reproducible.
        let s = s.set_seed(42);
        assert_eq!(
            s.run_seeded(&target, &[-1.0, 1.0]).unwrap(),
            s.run_seeded(&target, &[-1.0, 1.0]).unwrap()
        );
    }

    #[test]
    fn different_seed_different_trace() {
        let target = chapter_target();
        let s = sampler(50, 0.1);
        let a = s
            .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(1))
            .unwrap();
        let b = s
            .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(2))
            .unwrap();
        assert_ne!(a.records(), b.records());
    }

    #[test]
    fn trace_has_one_record_per_proposal() {
        let target = chapter_target();
        for n in [1, 2, 50, 1_000] {
            let run = sampler(n, 0.1)
                .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(n as u64))
                .unwrap();
            assert_eq!(run.records().len(), n);
            assert_eq!(run.path().nrows(), n);
        }
    }

    #[test]
    fn acceptance_rate_is_fraction_of_accepted_records() {
        let target = chapter_target();
        for seed in 0..20 {
            let run = sampler(50, 0.25)
                .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(seed))
                .unwrap();
            let accepted = run.records().iter().filter(|r| r.accepted).count();
            assert!((0.0..=1.0).contains(&run.acceptance_rate()));
            assert_eq!(run.acceptance_rate(), accepted as f64 / 50.0);
        }
    }

    #[test]
    fn constant_density_accepts_everything() {
        let target = DensityFn(|_: &[f64]| 0.3);
        for step_size in [0.01, 1.0, 100.0] {
            let run = sampler(1_000, step_size)
                .run(&target, &[0.0, 0.0, 0.0], &mut SmallRng::seed_from_u64(7))
                .unwrap();
            assert_eq!(run.acceptance_rate(), 1.0);
            assert_eq!(
                run.final_state(),
                run.records().last().unwrap().candidate.as_slice()
            );
        }
    }

    #[test]
    fn standard_gaussian_accepted_mean_near_origin() {
        let target = IsotropicGaussian::new(1.0).unwrap();
        for seed in [1, 2, 3] {
            let run = sampler(50_000, 1.0)
                .run(&target, &[0.0, 0.0], &mut SmallRng::seed_from_u64(seed))
                .unwrap();
            let mean = accepted_mean(&run).unwrap();
            assert_abs_diff_eq!(mean[0], 0.0, epsilon = 0.2);
            assert_abs_diff_eq!(mean[1], 0.0, epsilon = 0.2);
        }
    }

    #[test]
    fn smaller_steps_accept_more() {
        let target = chapter_target();
        let rates: Vec<f64> = [1.0, 0.25, 0.05, 0.001]
            .iter()
            .map(|&step| {
                sampler(5_000, step)
                    .run(&target, &[0.0, 0.0], &mut SmallRng::seed_from_u64(3))
                    .unwrap()
                    .acceptance_rate()
            })
            .collect();
        assert!(
            rates.windows(2).all(|w| w[0] < w[1]),
            "acceptance rates not increasing: {rates:?}"
        );
        assert!(rates[3] > 0.95, "tiny steps should almost always be accepted");
    }

    #[test]
    fn chapter_scenario() {
        let target = chapter_target();
        let s = sampler(50, 0.1);
        let run = s
            .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(run.records().len(), 50);
        assert_eq!(run.start(), &[-1.0, 1.0]);

        // Far out on the long axis, about half of all small steps go uphill and
        // are accepted outright.
        assert!(run.n_accepted() > 0);
        assert!(run.acceptance_rate() < 1.0);
        let replay = s
            .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(run.acceptance_rate(), replay.acceptance_rate());
    }

    /// Acceptance counts of the chapter runs for seed 9. Any change to the order in
    /// which randomness is drawn, or to the accept test, moves these numbers.
    /// `SmallRng` is a different generator on 32-bit targets, so the values only
    /// hold for 64-bit pointers.
    #[test]
    #[cfg(target_pointer_width = "64")]
    fn chapter_scenario_acceptance_counts() {
        let target = chapter_target();
        for (step_size, n_accepted, rate) in [(0.1, 31, 0.62), (0.25, 15, 0.3)] {
            let run = sampler(50, step_size)
                .run(&target, &[-1.0, 1.0], &mut SmallRng::seed_from_u64(9))
                .unwrap();
            assert_eq!(run.n_accepted(), n_accepted, "step size {step_size}");
            assert_eq!(run.acceptance_rate(), rate, "step size {step_size}");
        }
    }
}
