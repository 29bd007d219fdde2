//! Maximize x + y on the unit circle, written as minimizing 2 - x - y subject
//! to x^2 + y^2 = 1.
//!
//! The gradient is left to finite differences. Expected optimum is
//! (1/sqrt(2), 1/sqrt(2)) with objective 2 - sqrt(2).

use std::io;

use anyhow::Result;
use ipopt_bridge::finite_diff::Scheme;
use ipopt_bridge::{minimize, ProblemDefinition};
use ndarray::array;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok(2.0 - x.sum()))
        .finite_difference_gradient(Scheme::ThreePoint)
        .constraints(|_, x| Ok(array![x.dot(&x)]))
        .jacobian(|_, x| Ok(array![[2.0 * x[0], 2.0 * x[1]]]))
        .start(vec![1.0, 0.0])
        .variable_bounds(vec![-5.0, -5.0], vec![5.0, 5.0])
        .constraint_bounds(vec![1.0], vec![1.0])
        .build()?;

    let result = minimize(problem, &["print_level 0", "tol 1e-10"])?;

    info!(
        status = %result.status,
        iterations = result.iterations,
        "solve finished"
    );
    println!("xval {}", result.xval);
    println!("fval {} (expected {})", result.fval, 2.0 - 2f64.sqrt());
    println!("gval {}", result.gval);

    Ok(())
}
