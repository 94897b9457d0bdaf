/*!
# Saving Metropolis traces to CSV

Enable via the `csv` feature. Every proposal record becomes one row, so rejected
candidates are kept alongside accepted ones.
*/

use num_traits::Float;
use std::error::Error;
use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::metropolis::RunResult;

fn trace_header(prefix: &[&str], dim: usize) -> Vec<String> {
    let mut header: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
    header.extend(["iteration".to_string(), "accepted".to_string()]);
    header.extend((0..dim).map(|i| format!("dim_{}", i)));
    header
}

fn write_rows<T: Float + std::fmt::Display, W: std::io::Write>(
    wtr: &mut Writer<W>,
    prefix: &[String],
    run: &RunResult<T>,
) -> Result<(), Box<dyn Error>> {
    for (i, record) in run.records().iter().enumerate() {
        let mut row = prefix.to_vec();
        row.push(i.to_string());
        row.push(record.accepted.to_string());
        row.extend(record.candidate.iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }
    Ok(())
}

/**
Saves the proposal trace of one run.

Columns: `iteration`, `accepted`, then one `dim_i` column per coordinate of the
candidate.

# Examples

```rust
use mini_metropolis::config::MetropolisConfig;
use mini_metropolis::distributions::Gaussian2D;
use mini_metropolis::io::csv::save_trace_csv;
use mini_metropolis::metropolis::MetropolisSampler;

let target = Gaussian2D::correlated([0.0, 0.0], [0.22, 0.22], -0.9).unwrap();
let sampler = MetropolisSampler::new(MetropolisConfig::new(50, 0.1)).unwrap();
let run = sampler.run_seeded(&target, &[-1.0, 1.0]).unwrap();

save_trace_csv(&run, "/tmp/trace.csv")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_trace_csv<T: Float + std::fmt::Display>(
    run: &RunResult<T>,
    filename: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(trace_header(&[], run.dim()))?;
    write_rows(&mut wtr, &[], run)?;
    wtr.flush()?;
    Ok(())
}

/// Saves the traces of several chains into one file, with a leading `chain` column.
///
/// All runs must have the same dimension.
pub fn save_chains_csv<T: Float + std::fmt::Display>(
    runs: &[RunResult<T>],
    filename: impl AsRef<Path>,
) -> Result<(), Box<dyn Error>> {
    let dim = runs.first().map_or(0, RunResult::dim);
    if let Some(bad) = runs.iter().position(|r| r.dim() != dim) {
        return Err(format!(
            "Expected all chains to have dimension {dim}, chain {bad} has {}.",
            runs[bad].dim()
        )
        .into());
    }

    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(trace_header(&["chain"], dim))?;
    for (chain_idx, run) in runs.iter().enumerate() {
        write_rows(&mut wtr, &[chain_idx.to_string()], run)?;
    }
    wtr.flush()?;
    Ok(())
}
