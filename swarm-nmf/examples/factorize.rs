//! Recover a planted `H` for a fixed `W`.
//!
//! Builds `X = W·H_true` from small deterministic factors, fits `H` with
//! per-iteration tracing, and compares the result to the planted factor.
//!
//! Run: `cargo run -p swarm-nmf --example factorize`

use swarm_nmf::prelude::*;
use tracing_subscriber::EnvFilter;

const GENES: usize = 12;
const RANK: usize = 2;
const SAMPLES: usize = 5;

fn planted() -> Result<(Matrix, Matrix, Matrix)> {
    let mut w = Matrix::zeros(GENES, RANK);
    for i in 0..GENES {
        // Two overlapping programs: one rising, one falling along the genes.
        w.set(i, 0, (i + 1) as f64 / GENES as f64);
        w.set(i, 1, (GENES - i) as f64 / GENES as f64);
    }

    let mut h_true = Matrix::zeros(RANK, SAMPLES);
    for j in 0..SAMPLES {
        h_true.set(0, j, 1.0 + j as f64);
        h_true.set(1, j, 0.5 * (SAMPLES - j) as f64);
    }

    let x = w.matmul(&h_true)?;
    Ok((w, h_true, x))
}

fn print_matrix(name: &str, m: &Matrix) {
    println!("{name} ({}x{}):", m.rows(), m.cols());
    for i in 0..m.rows() {
        let row: Vec<String> = m.row(i).iter().map(|v| format!("{v:8.4}")).collect();
        println!("  [{}]", row.join(", "));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (w, h_true, x) = planted()?;

    let config = PsoConfig::builder()
        .population_size(40)
        .max_iterations(1500)
        .verbose(true)
        .log_every(250)
        .seed(42)
        .build()?;

    let mut observer = TracingObserver;
    let report = Optimizer::new(config).fit_with_observer(&w, &x, &mut observer)?;

    print_matrix("H (planted)", &h_true);
    print_matrix("H (fitted)", &report.h);

    let baseline = x.frobenius_norm();
    let error = report.best_fitness.sqrt();
    println!();
    println!("iterations:            {}", report.iterations);
    println!("status:                {:?}", report.status);
    println!("reconstruction error:  {error:.6}");
    println!("relative to ‖X‖_F:     {:.4}%", 100.0 * error / baseline);

    Ok(())
}
