//! End-to-end tests of the solve driver against a scripted solver application.
//!
//! These run without IPOPT installed; see `tests/ipopt.rs` for the real backend.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use common::{AppLog, ScriptedApp};
use ipopt_bridge::{
    run_with, BridgeError, BridgeResult, DType, ProblemAdapter, ProblemDefinition, ResultRecord,
    SolverConfig, SolverReturn,
};

fn solve<S: AsRef<str>>(
    problem: ProblemDefinition,
    lines: &[S],
) -> (BridgeResult<ResultRecord>, Rc<RefCell<AppLog>>) {
    let log = Rc::new(RefCell::new(AppLog::default()));
    let mut adapter = ProblemAdapter::new(problem);
    let result = run_with(|| Ok(ScriptedApp::new(&log)), &mut adapter, lines);
    (result, log)
}

const NO_OPTIONS: &[&str] = &[];

/// Separable quadratic with minimum at `target`, inside a box of half-width 2.
fn quadratic(target: Vec<f64>) -> ProblemDefinition {
    let n = target.len();
    let f_target = target.clone();
    let g_target = target;
    ProblemDefinition::builder()
        .objective(move |_, x| {
            Ok(x.iter()
                .zip(&f_target)
                .map(|(xi, ti)| (xi - ti).powi(2))
                .sum::<f64>())
        })
        .gradient(move |_, x| {
            Ok(x.iter()
                .zip(&g_target)
                .map(|(xi, ti)| 2.0 * (xi - ti))
                .collect::<Vec<f64>>())
        })
        .constraints(|_, x| Ok(vec![x.sum()]))
        .jacobian(|_, x| Ok(vec![1.0; x.len()]))
        .start(vec![0.0; n])
        .variable_bounds(vec![-2.0; n], vec![2.0; n])
        .constraint_bounds(vec![-1e20], vec![1e20])
        .build()
        .unwrap()
}

/// Test that a constant objective terminates successfully at the start.
#[test]
fn test_constant_objective_succeeds() {
    let problem = ProblemDefinition::builder()
        .objective(|_, _| Ok(1.0))
        .gradient(|_, _| Ok(vec![0.0]))
        .constraints(|_, _| Ok(vec![0.0]))
        .jacobian(|_, _| Ok(vec![0.0]))
        .start(vec![0.0])
        .variable_bounds(vec![-1e20], vec![1e20])
        .constraint_bounds(vec![-1e20], vec![1e20])
        .build()
        .unwrap();

    let (result, log) = solve(problem, NO_OPTIONS);
    let result = result.unwrap();

    assert!(result.success);
    assert_eq!(result.message, "SUCCESS");
    assert_abs_diff_eq!(result.fval, 1.0);
    assert_eq!(result.xval.to_vec(), vec![0.0]);
    assert_eq!(result.gval.to_vec(), vec![0.0]);
    assert!(log.borrow().finalized);
}

/// Test that an unconstrained-in-practice quadratic converges to its minimum.
#[test]
fn test_quadratic_converges() {
    let (result, _) = solve(quadratic(vec![1.0, -0.5]), NO_OPTIONS);
    let result = result.unwrap();

    assert_eq!(result.status, SolverReturn::Success);
    assert_abs_diff_eq!(result.xval[0], 1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(result.xval[1], -0.5, epsilon = 1e-8);
    assert_abs_diff_eq!(result.gval[0], 0.5, epsilon = 1e-8);
    assert!(result.iterations > 0);
}

/// Test that variable bounds reach the solver and stop the iterates.
#[test]
fn test_active_bound() {
    let (result, _) = solve(quadratic(vec![3.0]), NO_OPTIONS);
    let result = result.unwrap();

    assert!(result.success);
    assert_eq!(result.xval.to_vec(), vec![2.0]);
    assert_abs_diff_eq!(result.fval, 1.0);
}

/// Test that the last duplicate option wins and both lines reach the solver.
#[test]
fn test_duplicate_option_last_wins() {
    let (result, log) = solve(quadratic(vec![1.5]), &["max_iter 50", "max_iter 3"]);
    let result = result.unwrap();

    assert_eq!(result.status, SolverReturn::MaxiterExceeded);
    assert_eq!(result.message, "MAXITER_EXCEEDED");
    assert!(!result.success);
    assert_eq!(result.iterations, 3);

    let log = log.borrow();
    assert_eq!(log.option("max_iter"), Some("3"));
    let first = log.options_text.find("max_iter 50").unwrap();
    let second = log.options_text.find("max_iter 3").unwrap();
    assert!(first < second);
}

/// Test that forced settings are applied after user options and override them.
#[test]
fn test_forced_overrides_win() {
    let (result, log) = solve(
        quadratic(vec![0.5]),
        &["hessian_approximation exact", "sb no"],
    );
    result.unwrap();

    let log = log.borrow();
    assert!(log.rethrow);
    assert_eq!(log.option("hessian_approximation"), Some("limited-memory"));
    assert_eq!(log.option("sb"), Some("yes"));
    let tail: Vec<_> = log.options.iter().rev().take(2).collect();
    assert_eq!(tail[0].0, "hessian_approximation");
    assert_eq!(tail[1].0, "sb");
}

/// Test that a failing host callable aborts the solve with its own error.
#[test]
fn test_host_fault_propagates() {
    let problem = ProblemDefinition::builder()
        .objective(|_, _| -> anyhow::Result<f64> { anyhow::bail!("objective exploded") })
        .constraints(|_, x| Ok(vec![x[0]]))
        .start(vec![0.0])
        .variable_bounds(vec![-1.0], vec![1.0])
        .constraint_bounds(vec![-1.0], vec![1.0])
        .build()
        .unwrap();

    let (result, log) = solve(problem, NO_OPTIONS);

    match result.unwrap_err() {
        BridgeError::HostFault { callable, source } => {
            assert_eq!(callable, "evalf");
            assert_eq!(source.to_string(), "objective exploded");
        }
        other => panic!("expected a host fault, got {other}"),
    }
    assert!(!log.borrow().finalized);
}

/// Test that a short constraint vector is a length error, not a solver status.
#[test]
fn test_short_constraint_result_fails() {
    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok(x[0]))
        .gradient(|_, _| Ok(vec![1.0]))
        .constraints(|_, _| Ok(Vec::<f64>::new()))
        .jacobian(|_, _| Ok(vec![0.0]))
        .start(vec![0.0])
        .variable_bounds(vec![-1.0], vec![1.0])
        .constraint_bounds(vec![-1.0], vec![1.0])
        .build()
        .unwrap();

    let (result, _) = solve(problem, NO_OPTIONS);

    assert!(matches!(
        result.unwrap_err(),
        BridgeError::LengthMismatch {
            expected: 1,
            found: 0,
            ..
        }
    ));
}

/// Test that integer gradients are rejected instead of cast.
#[test]
fn test_integer_gradient_is_type_mismatch() {
    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok(x[0]))
        .gradient(|_, _| Ok(vec![1_i64]))
        .constraints(|_, x| Ok(vec![x[0]]))
        .jacobian(|_, _| Ok(vec![1.0]))
        .start(vec![0.0])
        .variable_bounds(vec![-1.0], vec![1.0])
        .constraint_bounds(vec![-1.0], vec![1.0])
        .build()
        .unwrap();

    let (result, _) = solve(problem, NO_OPTIONS);

    assert!(matches!(
        result.unwrap_err(),
        BridgeError::TypeMismatch {
            expected: DType::Float64,
            found: DType::Int64,
        }
    ));
}

/// Test that a vector-valued objective is a conversion error.
#[test]
fn test_vector_objective_fails_conversion() {
    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok(x.to_owned()))
        .constraints(|_, x| Ok(vec![x[0]]))
        .start(vec![0.0])
        .variable_bounds(vec![-1.0], vec![1.0])
        .constraint_bounds(vec![-1.0], vec![1.0])
        .build()
        .unwrap();

    let (result, _) = solve(problem, NO_OPTIONS);

    assert!(matches!(
        result.unwrap_err(),
        BridgeError::Conversion { what: "evalf" }
    ));
}

/// Test that a missing Jacobian asks the solver to approximate it.
#[test]
fn test_missing_jacobian_is_approximated() {
    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok((x[0] - 0.25).powi(2)))
        .gradient(|_, x| Ok(vec![2.0 * (x[0] - 0.25)]))
        .constraints(|_, x| Ok(vec![x[0]]))
        .start(vec![0.0])
        .variable_bounds(vec![-1.0], vec![1.0])
        .constraint_bounds(vec![-1.0], vec![1.0])
        .build()
        .unwrap();

    let (result, log) = solve(problem, &["tol 1e-10"]);
    let result = result.unwrap();

    assert!(result.success);
    assert_abs_diff_eq!(result.xval[0], 0.25, epsilon = 1e-9);
    let log = log.borrow();
    assert_eq!(
        log.option("jacobian_approximation"),
        Some("finite-difference-values")
    );
    assert_eq!(log.jacobian_value_calls, 0);
}

/// Test that a problem without a gradient callable uses finite differences.
#[test]
fn test_finite_difference_gradient_converges() {
    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok((x[0] - 1.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2)))
        .constraints(|_, x| Ok(vec![x[0] - x[1]]))
        .jacobian(|_, _| Ok(vec![1.0, -1.0]))
        .start(vec![0.0, 0.0])
        .variable_bounds(vec![-5.0, -5.0], vec![5.0, 5.0])
        .constraint_bounds(vec![-10.0], vec![10.0])
        .build()
        .unwrap();

    let (result, _) = solve(problem, &["tol 1e-6", "max_iter 500"]);
    let result = result.unwrap();

    assert!(result.success, "finished with {}", result.message);
    assert_abs_diff_eq!(result.xval[0], 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(result.xval[1], -1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(result.gval[0], 2.0, epsilon = 1e-5);
}

/// Test that an integer starting point is rejected before the first evaluation.
#[test]
fn test_integer_start_rejected() {
    let problem = ProblemDefinition::builder()
        .objective(|_, x| Ok(x[0]))
        .constraints(|_, x| Ok(vec![x[0]]))
        .start(vec![0_i32])
        .variable_bounds(vec![-1.0], vec![1.0])
        .constraint_bounds(vec![-1.0], vec![1.0])
        .build()
        .unwrap();

    let (result, log) = solve(problem, NO_OPTIONS);

    assert!(matches!(
        result.unwrap_err(),
        BridgeError::TypeMismatch {
            found: DType::Int32,
            ..
        }
    ));
    assert_eq!(log.borrow().objective_calls, 0);
}

/// Test that a solver returning without finalize is reported.
#[test]
fn test_missing_result_reported() {
    let log = Rc::new(RefCell::new(AppLog::default()));
    let mut adapter = ProblemAdapter::new(quadratic(vec![0.0]));

    let result = run_with(
        || Ok(ScriptedApp::without_finalize(&log)),
        &mut adapter,
        NO_OPTIONS,
    );

    assert!(matches!(result, Err(BridgeError::MissingResult)));
}

/// Test that a failing application factory aborts before any callback runs.
#[test]
fn test_factory_error_propagates() {
    let mut adapter = ProblemAdapter::new(quadratic(vec![0.0]));

    let result = run_with(
        || -> BridgeResult<ScriptedApp> { Err(BridgeError::Solver("no license".to_string())) },
        &mut adapter,
        NO_OPTIONS,
    );

    assert!(matches!(result, Err(BridgeError::Solver(_))));
    assert!(adapter.current_point().is_none());
}

/// Test that config-rendered option lines drive the solver.
#[test]
fn test_config_lines_drive_solver() {
    let config = SolverConfig {
        max_iter: Some(2),
        ..SolverConfig::default()
    };
    let lines = config.to_option_lines().unwrap();

    let (result, _) = solve(quadratic(vec![1.0]), &lines);
    let result = result.unwrap();

    assert_eq!(result.status, SolverReturn::MaxiterExceeded);
    assert_eq!(result.iterations, 2);
}
