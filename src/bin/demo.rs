//! Runs the random-walk Metropolis sampler on a strongly correlated 2D Gaussian with
//! two step sizes and reports how often each chain moved.

use mini_metropolis::config::MetropolisConfig;
use mini_metropolis::distributions::Gaussian2D;
use mini_metropolis::metropolis::MetropolisSampler;
use mini_metropolis::stats::accepted_mean;
use std::error::Error;

#[cfg(feature = "csv")]
use mini_metropolis::io::csv::save_trace_csv;

/// Traces go to the working directory, except under `cargo test`.
#[cfg(feature = "csv")]
fn trace_dir() -> std::path::PathBuf {
    if cfg!(test) {
        std::env::temp_dir()
    } else {
        std::path::PathBuf::from(".")
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    const NUM_PROPOSALS: usize = 50;
    const SEED: u64 = 9;
    const STEP_SIZES: [f64; 2] = [0.1, 0.25];
    let starting_point = [-1.0, 1.0];

    let target = Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9)?;

    for step_size in STEP_SIZES {
        let config = MetropolisConfig::new(NUM_PROPOSALS, step_size).set_seed(SEED);
        let sampler = MetropolisSampler::new(config)?;
        let run = sampler.run_seeded(&target, &starting_point)?;

        println!(
            "step size {step_size}: {}/{} proposals accepted (rate {:.2})",
            run.n_accepted(),
            run.num_proposals(),
            run.acceptance_rate()
        );
        match accepted_mean(&run) {
            Some(mean) => println!("  mean of accepted moves: ({:.3}, {:.3})", mean[0], mean[1]),
            None => println!("  the chain never moved"),
        }
        println!(
            "  final position: ({:.3}, {:.3})",
            run.final_state()[0],
            run.final_state()[1]
        );

        #[cfg(feature = "csv")]
        {
            let filename = trace_dir().join(format!("trace_step_{step_size}.csv"));
            save_trace_csv(&run, &filename)?;
            println!("  saved trace in {}", filename.display());
        }
    }

    Ok(())
}
