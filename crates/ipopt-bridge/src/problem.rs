//! Problem definition supplied by the caller.
//!
//! A problem is four callables plus bounds and a starting point. Callables take
//! the "new point" flag forwarded from the solver and a read-only view of the
//! current point, and return any [`HostValue`]. Their results are only checked
//! when they are marshaled into solver buffers.

use std::fmt;

use ndarray::ArrayView1;

use crate::error::{BridgeError, BridgeResult};
use crate::finite_diff::Scheme;
use crate::host::HostValue;

/// Boxed host callable `(new_x, x) -> value`.
pub type HostFn = Box<dyn FnMut(bool, ArrayView1<'_, f64>) -> anyhow::Result<HostValue>>;

fn boxed<F, V>(mut f: F) -> HostFn
where
    F: FnMut(bool, ArrayView1<'_, f64>) -> anyhow::Result<V> + 'static,
    V: Into<HostValue>,
{
    Box::new(move |new_x: bool, x: ArrayView1<'_, f64>| f(new_x, x).map(Into::into))
}

/// How the objective gradient is obtained.
pub enum Gradient {
    /// Host callable returning a vector of length xcount.
    Callable(HostFn),
    /// Finite differences of the objective.
    FiniteDifference(Scheme),
}

impl fmt::Debug for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gradient::Callable(_) => f.write_str("Callable"),
            Gradient::FiniteDifference(scheme) => write!(f, "FiniteDifference({scheme:?})"),
        }
    }
}

/// Immutable definition of one nonlinear program.
pub struct ProblemDefinition {
    pub(crate) evalf: HostFn,
    pub(crate) gradf: Gradient,
    pub(crate) evalg: HostFn,
    /// Row-major constraint Jacobian; `None` lets the solver approximate it.
    pub(crate) gradg: Option<HostFn>,
    pub(crate) xstart: HostValue,
    pub(crate) xcount: usize,
    pub(crate) xlimlo: HostValue,
    pub(crate) xlimhi: HostValue,
    pub(crate) gcount: usize,
    pub(crate) glimlo: HostValue,
    pub(crate) glimhi: HostValue,
}

impl ProblemDefinition {
    pub fn builder() -> ProblemBuilder {
        ProblemBuilder::default()
    }

    pub fn xcount(&self) -> usize {
        self.xcount
    }

    pub fn gcount(&self) -> usize {
        self.gcount
    }

    pub fn has_jacobian(&self) -> bool {
        self.gradg.is_some()
    }
}

impl fmt::Debug for ProblemDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemDefinition")
            .field("xcount", &self.xcount)
            .field("gcount", &self.gcount)
            .field("gradf", &self.gradf)
            .field("gradg", &self.gradg.as_ref().map(|_| "Callable"))
            .finish_non_exhaustive()
    }
}

/// Builder for [`ProblemDefinition`].
///
/// Counts may be given explicitly or derived from the lengths of the lower
/// limit arrays. Bounds and start are otherwise checked only when the solver
/// asks for them.
#[derive(Default)]
pub struct ProblemBuilder {
    evalf: Option<HostFn>,
    gradf: Option<Gradient>,
    evalg: Option<HostFn>,
    gradg: Option<HostFn>,
    xstart: Option<HostValue>,
    xcount: Option<usize>,
    xlimit: Option<(HostValue, HostValue)>,
    gcount: Option<usize>,
    glimit: Option<(HostValue, HostValue)>,
}

impl ProblemBuilder {
    /// Objective `evalf(new_x, x) -> scalar`.
    pub fn objective<F, V>(mut self, f: F) -> Self
    where
        F: FnMut(bool, ArrayView1<'_, f64>) -> anyhow::Result<V> + 'static,
        V: Into<HostValue>,
    {
        self.evalf = Some(boxed(f));
        self
    }

    /// Objective gradient `gradf(new_x, x) -> vector[xcount]`.
    pub fn gradient<F, V>(mut self, f: F) -> Self
    where
        F: FnMut(bool, ArrayView1<'_, f64>) -> anyhow::Result<V> + 'static,
        V: Into<HostValue>,
    {
        self.gradf = Some(Gradient::Callable(boxed(f)));
        self
    }

    /// Approximate the objective gradient by finite differences of the objective.
    pub fn finite_difference_gradient(mut self, scheme: Scheme) -> Self {
        self.gradf = Some(Gradient::FiniteDifference(scheme));
        self
    }

    /// Constraints `evalg(new_x, x) -> vector[gcount]`.
    pub fn constraints<F, V>(mut self, f: F) -> Self
    where
        F: FnMut(bool, ArrayView1<'_, f64>) -> anyhow::Result<V> + 'static,
        V: Into<HostValue>,
    {
        self.evalg = Some(boxed(f));
        self
    }

    /// Constraint Jacobian `gradg(new_x, x) -> vector[gcount * xcount]`, row-major.
    pub fn jacobian<F, V>(mut self, f: F) -> Self
    where
        F: FnMut(bool, ArrayView1<'_, f64>) -> anyhow::Result<V> + 'static,
        V: Into<HostValue>,
    {
        self.gradg = Some(boxed(f));
        self
    }

    pub fn start(mut self, xstart: impl Into<HostValue>) -> Self {
        self.xstart = Some(xstart.into());
        self
    }

    pub fn variables(mut self, xcount: usize) -> Self {
        self.xcount = Some(xcount);
        self
    }

    pub fn variable_bounds(mut self, lo: impl Into<HostValue>, hi: impl Into<HostValue>) -> Self {
        self.xlimit = Some((lo.into(), hi.into()));
        self
    }

    pub fn constraint_count(mut self, gcount: usize) -> Self {
        self.gcount = Some(gcount);
        self
    }

    pub fn constraint_bounds(mut self, lo: impl Into<HostValue>, hi: impl Into<HostValue>) -> Self {
        self.glimit = Some((lo.into(), hi.into()));
        self
    }

    pub fn build(self) -> BridgeResult<ProblemDefinition> {
        let evalf = self.evalf.ok_or_else(|| missing("objective (evalf)"))?;
        let evalg = self.evalg.ok_or_else(|| missing("constraints (evalg)"))?;
        let xstart = self.xstart.ok_or_else(|| missing("starting point (xstart)"))?;
        let (xlimlo, xlimhi) = self.xlimit.ok_or_else(|| missing("variable bounds (xlimit)"))?;
        let (glimlo, glimhi) = self.glimit.ok_or_else(|| missing("constraint bounds (glimit)"))?;

        let xcount = resolve_count("search area (xlimit)", self.xcount, &xlimlo, &xlimhi)?;
        let gcount = resolve_count("constraints (glimit)", self.gcount, &glimlo, &glimhi)?;

        Ok(ProblemDefinition {
            evalf,
            gradf: self
                .gradf
                .unwrap_or(Gradient::FiniteDifference(Scheme::default())),
            evalg,
            gradg: self.gradg,
            xstart,
            xcount,
            xlimlo,
            xlimhi,
            gcount,
            glimlo,
            glimhi,
        })
    }
}

fn missing(what: &str) -> BridgeError {
    BridgeError::InvalidProblem(format!("missing {what}"))
}

/// Use the explicit count if given, otherwise the common length of both limits.
fn resolve_count(
    what: &str,
    explicit: Option<usize>,
    lo: &HostValue,
    hi: &HostValue,
) -> BridgeResult<usize> {
    let count = match explicit {
        Some(count) => count,
        None => {
            let lo_len = lo.to_array().len();
            let hi_len = hi.to_array().len();
            if lo_len != hi_len {
                return Err(BridgeError::InvalidProblem(format!(
                    "mismatched lengths of lower and upper limits on {what}: {lo_len} vs {hi_len}"
                )));
            }
            lo_len
        }
    };

    if count == 0 {
        return Err(BridgeError::InvalidProblem(format!(
            "{what} must have a positive count"
        )));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ProblemBuilder {
        ProblemDefinition::builder()
            .objective(|_, x| Ok(x.sum()))
            .gradient(|_, x| Ok(vec![1.0; x.len()]))
            .constraints(|_, x| Ok(vec![x[0]]))
            .jacobian(|_, x| Ok(vec![1.0; x.len()]))
            .start(vec![0.0, 0.0])
    }

    #[test]
    fn test_counts_derived_from_limits() {
        let problem = base()
            .variable_bounds(vec![-1.0, -1.0], vec![1.0, 1.0])
            .constraint_bounds(vec![0.0], vec![2.0])
            .build()
            .unwrap();

        assert_eq!(problem.xcount(), 2);
        assert_eq!(problem.gcount(), 1);
        assert!(problem.has_jacobian());
    }

    #[test]
    fn test_explicit_counts_win() {
        let problem = base()
            .variables(2)
            .variable_bounds(vec![-1.0, -1.0, -1.0], vec![1.0])
            .constraint_count(1)
            .constraint_bounds(vec![0.0], vec![2.0])
            .build()
            .unwrap();

        assert_eq!(problem.xcount(), 2);
    }

    #[test]
    fn test_mismatched_limits_rejected() {
        let err = base()
            .variable_bounds(vec![-1.0, -1.0], vec![1.0])
            .constraint_bounds(vec![0.0], vec![2.0])
            .build()
            .unwrap_err();

        assert!(matches!(err, BridgeError::InvalidProblem(_)));
        assert!(err.to_string().contains("search area"));
    }

    #[test]
    fn test_zero_count_rejected() {
        let err = base()
            .variable_bounds(vec![-1.0], vec![1.0])
            .constraint_count(0)
            .constraint_bounds(vec![0.0], vec![2.0])
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("positive count"));
    }

    #[test]
    fn test_missing_gradient_defaults_to_finite_differences() {
        let problem = ProblemDefinition::builder()
            .objective(|_, x| Ok(x.sum()))
            .constraints(|_, x| Ok(vec![x[0]]))
            .start(vec![0.0])
            .variable_bounds(vec![-1.0], vec![1.0])
            .constraint_bounds(vec![0.0], vec![1.0])
            .build()
            .unwrap();

        assert!(matches!(
            problem.gradf,
            Gradient::FiniteDifference(Scheme::ThreePoint)
        ));
        assert!(!problem.has_jacobian());
    }

    #[test]
    fn test_missing_objective_rejected() {
        let err = ProblemDefinition::builder()
            .constraints(|_, x| Ok(vec![x[0]]))
            .start(vec![0.0])
            .variable_bounds(vec![-1.0], vec![1.0])
            .constraint_bounds(vec![0.0], vec![1.0])
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("evalf"));
    }
}
