//! A compact random-walk Metropolis sampler that keeps a record of every proposal.
//!
//! See [`metropolis`] for the sampler itself and [`core`] for running several
//! independent chains in parallel.

pub mod config;
pub mod core;
pub mod distributions;
pub mod error;
pub mod io;
pub mod metropolis;
pub mod stats;

pub use config::MetropolisConfig;
pub use error::{MetropolisError, Result};
pub use metropolis::{MetropolisSampler, ProposalRecord, RunResult};
