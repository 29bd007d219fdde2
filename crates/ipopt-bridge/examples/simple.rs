//! Closest point to (1, 1) outside the disc of radius 2, within [0, 5]^2.
//!
//! Usage: `cargo run -p ipopt-bridge --features ipopt --example simple [solver.toml]`
//!
//! The optional TOML file is read as a [`SolverConfig`]; without it the solve
//! runs with `print_level 0`.

use std::io;

use anyhow::{Context, Result};
use ipopt_bridge::{load_config, minimize, ProblemDefinition, SolverConfig};
use ndarray::{array, ArrayView1};
use tracing::info;

fn distance_to_one(x: ArrayView1<'_, f64>) -> f64 {
    x.iter().map(|v| (v - 1.0).powi(2)).sum::<f64>().sqrt()
}

fn norm(x: ArrayView1<'_, f64>) -> f64 {
    x.dot(&x).sqrt()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("Failed to load {path}"))?,
        None => SolverConfig {
            print_level: Some(0),
            ..SolverConfig::default()
        },
    };

    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok(distance_to_one(x)))
        .gradient(|_, x| Ok(x.mapv(|v| v - 1.0) / distance_to_one(x)))
        .constraints(|_, x| Ok(array![norm(x)]))
        .jacobian(|_, x| Ok(array![[x[0] / norm(x), x[1] / norm(x)]]))
        .start(vec![1.0, 3.0])
        .variable_bounds(vec![0.0, 0.0], vec![5.0, 5.0])
        .constraint_bounds(vec![2.0], vec![f64::INFINITY])
        .build()?;

    let result = minimize(problem, &config.to_option_lines()?)?;

    info!(success = result.success, status = %result.status, "solve finished");
    println!("status code {}", result.status.code());
    println!("status text {}", result.message);
    println!("iters {}", result.iterations);
    println!("xval {}", result.xval);
    println!("fval {}", result.fval);
    println!("gval {}", result.gval);

    Ok(())
}
