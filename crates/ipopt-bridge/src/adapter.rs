//! Proxy problem that implements the solver callback protocol on top of a
//! [`ProblemDefinition`].
//!
//! The adapter keeps a private copy of the point the solver is currently
//! probing. It is replaced only when the solver flags a new point, so every
//! evaluation between two such flags sees the same snapshot even though the
//! solver's own buffer is only valid for a single call.

use ndarray::{Array1, ArrayView1};
use tracing::{debug, trace, warn};

use crate::bridge::{export_view, import_exact};
use crate::error::{BridgeError, BridgeResult};
use crate::finite_diff::{self, Bounds};
use crate::host::HostValue;
use crate::problem::{Gradient, ProblemDefinition};
use crate::protocol::{Index, IterationInfo, Number, StartingPointRequest, StructuralInfo, Tnlp};
use crate::status::ResultRecord;

/// Option line added when the problem has no Jacobian callable.
pub const JACOBIAN_APPROXIMATION: &str = "jacobian_approximation finite-difference-values";

/// Adapter between one problem definition and one solve.
#[derive(Debug)]
pub struct ProblemAdapter {
    problem: ProblemDefinition,
    current: Option<Array1<f64>>,
    result: Option<ResultRecord>,
    iterations: usize,
    /// Variable bounds as handed to the solver, kept for finite differences.
    bounds: Option<(Vec<f64>, Vec<f64>)>,
    /// Set after finite differences probed `evalf` at other points.
    evalf_moved: bool,
}

impl ProblemAdapter {
    pub fn new(problem: ProblemDefinition) -> Self {
        Self {
            problem,
            current: None,
            result: None,
            iterations: 0,
            bounds: None,
            evalf_moved: false,
        }
    }

    pub fn problem(&self) -> &ProblemDefinition {
        &self.problem
    }

    /// Option lines implied by the problem definition, appended after user lines.
    pub fn implied_options(&self) -> Vec<String> {
        if self.problem.has_jacobian() {
            Vec::new()
        } else {
            vec![JACOBIAN_APPROXIMATION.to_string()]
        }
    }

    /// Snapshot of the point the solver is currently probing.
    pub fn current_point(&self) -> Option<ArrayView1<'_, f64>> {
        self.current.as_ref().map(Array1::view)
    }

    /// Result written by finalize, if the solver got that far.
    pub fn result(&self) -> Option<&ResultRecord> {
        self.result.as_ref()
    }

    /// Take the result, leaving the adapter without one.
    pub fn take_result(&mut self) -> Option<ResultRecord> {
        self.result.take()
    }

    /// Replace the current point with a deep copy of `x` when the solver flags a
    /// new point, or when there is no snapshot yet.
    pub fn refresh_point(&mut self, new_x: bool, x: &[Number]) {
        if new_x || self.current.is_none() {
            trace!(len = x.len(), "refreshing current point");
            self.current = Some(export_view(x).to_owned());
        }
    }

    fn call_evalf(&mut self, new_x: bool) -> BridgeResult<f64> {
        let new_x = new_x || std::mem::take(&mut self.evalf_moved);
        let point = snapshot(&self.current);
        let value = (self.problem.evalf)(new_x, point).map_err(|e| BridgeError::host("evalf", e))?;
        scalar_objective(value)
    }

    fn finite_difference_gradient(
        &mut self,
        new_x: bool,
        scheme: finite_diff::Scheme,
        grad: &mut [Number],
    ) -> BridgeResult<()> {
        let f0 = self.call_evalf(new_x)?;
        let Self {
            problem,
            current,
            bounds,
            evalf_moved,
            ..
        } = self;
        let x = snapshot(current);
        let bounds = bounds.as_ref().map(|(lower, upper)| Bounds { lower, upper });
        let evalf = &mut problem.evalf;

        *evalf_moved = true;
        finite_diff::objective_gradient(
            |p| scalar_objective(evalf(true, p).map_err(|e| BridgeError::host("evalf", e))?),
            x,
            f0,
            bounds,
            scheme,
            grad,
        )
    }
}

/// View of the current point; empty before the first refresh.
fn snapshot(current: &Option<Array1<f64>>) -> ArrayView1<'_, f64> {
    match current {
        Some(x) => x.view(),
        None => ArrayView1::from(&[] as &[f64]),
    }
}

fn scalar_objective(value: HostValue) -> BridgeResult<f64> {
    value
        .as_scalar()
        .ok_or(BridgeError::Conversion { what: "evalf" })
}

impl Tnlp for ProblemAdapter {
    fn query_structure(&mut self) -> BridgeResult<StructuralInfo> {
        let info = StructuralInfo::dense(self.problem.xcount, self.problem.gcount);
        debug!(
            xlen = info.xlen,
            glen = info.glen,
            jaclen = info.jaclen,
            hesslen = info.hesslen,
            "reporting dense problem structure"
        );
        Ok(info)
    }

    fn query_bounds(
        &mut self,
        x_l: &mut [Number],
        x_u: &mut [Number],
        g_l: &mut [Number],
        g_u: &mut [Number],
    ) -> BridgeResult<()> {
        import_exact("lower limit (xlimlo)", x_l, &self.problem.xlimlo.to_array())?;
        import_exact("upper limit (xlimhi)", x_u, &self.problem.xlimhi.to_array())?;
        import_exact("lower limit (glimlo)", g_l, &self.problem.glimlo.to_array())?;
        import_exact("upper limit (glimhi)", g_u, &self.problem.glimhi.to_array())?;

        self.bounds = Some((x_l.to_vec(), x_u.to_vec()));
        Ok(())
    }

    fn query_start(&mut self, request: StartingPointRequest, x: &mut [Number]) -> BridgeResult<()> {
        if request.z || request.lambda {
            return Err(BridgeError::UnsupportedRequest(
                "setting (bound) multipliers is not supported for the starting point".to_string(),
            ));
        }

        if request.x {
            import_exact("starting point (xstart)", x, &self.problem.xstart.to_array())?;
        }
        Ok(())
    }

    fn evaluate_objective(&mut self, new_x: bool, x: &[Number]) -> BridgeResult<Number> {
        self.refresh_point(new_x, x);
        self.call_evalf(new_x)
    }

    fn evaluate_constraints(
        &mut self,
        new_x: bool,
        x: &[Number],
        g: &mut [Number],
    ) -> BridgeResult<()> {
        self.refresh_point(new_x, x);
        let value = (self.problem.evalg)(new_x, snapshot(&self.current))
            .map_err(|e| BridgeError::host("evalg", e))?;
        import_exact("the result of evalg", g, &value.to_array())
    }

    fn evaluate_objective_gradient(
        &mut self,
        new_x: bool,
        x: &[Number],
        grad: &mut [Number],
    ) -> BridgeResult<()> {
        self.refresh_point(new_x, x);
        let scheme = match &mut self.problem.gradf {
            Gradient::Callable(gradf) => {
                let value = gradf(new_x, snapshot(&self.current))
                    .map_err(|e| BridgeError::host("gradf", e))?;
                return import_exact("the result of gradf", grad, &value.to_array());
            }
            Gradient::FiniteDifference(scheme) => *scheme,
        };
        self.finite_difference_gradient(new_x, scheme, grad)
    }

    fn query_sparsity_pattern(
        &mut self,
        rows: &mut [Index],
        cols: &mut [Index],
    ) -> BridgeResult<()> {
        let xlen = self.problem.xcount;
        let glen = self.problem.gcount;
        let jaclen = xlen * glen;
        if rows.len() < jaclen || cols.len() < jaclen {
            return Err(BridgeError::LengthMismatch {
                what: "sparsity pattern buffer",
                expected: jaclen,
                found: rows.len().min(cols.len()),
            });
        }

        for row in 0..glen {
            for col in 0..xlen {
                let offset = row * xlen + col;
                rows[offset] = row as Index;
                cols[offset] = col as Index;
            }
        }
        debug!(entries = jaclen, "filled dense Jacobian pattern");
        Ok(())
    }

    fn evaluate_jacobian_values(
        &mut self,
        new_x: bool,
        x: &[Number],
        values: &mut [Number],
    ) -> BridgeResult<()> {
        self.refresh_point(new_x, x);
        let point = snapshot(&self.current);
        let gradg = self.problem.gradg.as_mut().ok_or_else(|| {
            BridgeError::UnsupportedRequest(
                "constraint Jacobian values requested but no gradg was supplied".to_string(),
            )
        })?;
        let value = gradg(new_x, point).map_err(|e| BridgeError::host("gradg", e))?;
        import_exact("the result of gradg", values, &value.to_array())
    }

    fn intermediate(&mut self, info: IterationInfo) -> bool {
        trace!(
            iteration = info.iteration,
            objective = info.objective,
            inf_pr = info.inf_pr,
            inf_du = info.inf_du,
            "iteration"
        );
        self.iterations = info.iteration;
        true
    }

    fn finalize(&mut self, code: i32, x: &[Number], g: &[Number], fval: Number) {
        if self.result.is_some() {
            warn!(code, "finalize called more than once, keeping the first result");
            return;
        }

        let mut record = ResultRecord::new(
            code,
            fval,
            export_view(x).to_owned(),
            export_view(g).to_owned(),
        );
        record.iterations = self.iterations;
        debug!(status = %record.status, fval, "solution finalized");
        self.result = Some(record);
    }
}
