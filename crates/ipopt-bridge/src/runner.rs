//! Solve driver: creates a solver application, configures it and hands it the
//! problem adapter.

use tracing::{debug, info, warn};

use crate::adapter::ProblemAdapter;
use crate::error::{BridgeError, BridgeResult};
use crate::options;
use crate::problem::ProblemDefinition;
use crate::protocol::Tnlp;
use crate::status::{ResultRecord, SolverReturn};

/// A solver application able to drive a [`Tnlp`].
///
/// One instance serves one solve. It is created by the factory passed to
/// [`run_with`] and dropped before `run_with` returns, on every path.
pub trait Application {
    /// Whether an error raised inside a callback ends the solve and is
    /// returned from [`Application::optimize`], instead of being folded into a
    /// failure status.
    fn rethrow_host_faults(&mut self, enabled: bool);

    /// Read option text in option-file syntax and prepare the solver.
    fn initialize(&mut self, options: &str) -> BridgeResult<()>;

    /// Set one option programmatically, after [`Application::initialize`].
    fn set_string_option(&mut self, key: &str, value: &str) -> BridgeResult<()>;

    /// Run the solver to termination.
    fn optimize(&mut self, problem: &mut dyn Tnlp) -> BridgeResult<SolverReturn>;
}

/// Solve with an application produced by `factory`.
///
/// `lines` are user option lines; options implied by the problem are appended
/// after them, and the forced overrides are set last. Callback errors end the
/// solve and are returned unchanged.
pub fn run_with<A, F, S>(
    factory: F,
    adapter: &mut ProblemAdapter,
    lines: &[S],
) -> BridgeResult<ResultRecord>
where
    A: Application,
    F: FnOnce() -> BridgeResult<A>,
    S: AsRef<str>,
{
    let mut all_lines: Vec<String> = lines.iter().map(|l| l.as_ref().to_string()).collect();
    all_lines.extend(adapter.implied_options());
    let text = options::build(&all_lines);
    debug!(lines = all_lines.len(), "assembled solver options");

    let mut app = factory()?;
    app.rethrow_host_faults(true);
    app.initialize(&text)?;
    options::apply_forced_overrides(&mut app)?;

    let status = app.optimize(adapter)?;
    drop(app);

    let record = adapter.take_result().ok_or(BridgeError::MissingResult)?;
    if record.status != status {
        warn!(
            returned = %status,
            finalized = %record.status,
            "solver return status differs from the finalized status"
        );
    }
    info!(
        status = %record.status,
        fval = record.fval,
        iterations = record.iterations,
        "solve finished"
    );
    Ok(record)
}

/// Solve `problem` with a caller-provided application factory.
pub fn minimize_with<A, F, S>(
    factory: F,
    problem: ProblemDefinition,
    lines: &[S],
) -> BridgeResult<ResultRecord>
where
    A: Application,
    F: FnOnce() -> BridgeResult<A>,
    S: AsRef<str>,
{
    let mut adapter = ProblemAdapter::new(problem);
    run_with(factory, &mut adapter, lines)
}

/// Solve with IPOPT.
#[cfg(feature = "ipopt")]
pub fn run<S: AsRef<str>>(adapter: &mut ProblemAdapter, lines: &[S]) -> BridgeResult<ResultRecord> {
    run_with(|| Ok(crate::ipopt::IpoptApplication::new()), adapter, lines)
}

/// Solve `problem` with IPOPT.
///
/// ```no_run
/// use ipopt_bridge::{minimize, ProblemDefinition};
///
/// let problem = ProblemDefinition::builder()
///     .objective(|_, x| Ok((x[0] - 1.0).powi(2)))
///     .gradient(|_, x| Ok(vec![2.0 * (x[0] - 1.0)]))
///     .constraints(|_, x| Ok(vec![x[0]]))
///     .jacobian(|_, _| Ok(vec![1.0]))
///     .start(vec![0.0])
///     .variable_bounds(vec![-10.0], vec![10.0])
///     .constraint_bounds(vec![-10.0], vec![10.0])
///     .build()?;
///
/// let result = minimize(problem, &["tol 1e-8"])?;
/// assert!(result.success);
/// # Ok::<(), ipopt_bridge::BridgeError>(())
/// ```
#[cfg(feature = "ipopt")]
pub fn minimize<S: AsRef<str>>(problem: ProblemDefinition, lines: &[S]) -> BridgeResult<ResultRecord> {
    let mut adapter = ProblemAdapter::new(problem);
    run(&mut adapter, lines)
}
