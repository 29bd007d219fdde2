//! The callback protocol a solver application drives.
//!
//! The solver owns the control flow: it asks for the problem structure, the
//! bounds and the starting point, then evaluates functions and derivatives in
//! an order of its choosing, and finally reports the solution. All slices passed
//! to these methods belong to the solver and are only valid for the duration of
//! the call.

use crate::error::BridgeResult;

/// Floating-point number type shared with the solver.
pub type Number = f64;

/// Index type for sparse matrix triplets shared with the solver.
pub type Index = i32;

/// Numbering of sparse matrix triplets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStyle {
    /// 0-based
    C,
    /// 1-based
    Fortran,
}

/// Problem dimensions reported to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralInfo {
    /// Number of variables.
    pub xlen: usize,
    /// Number of constraints.
    pub glen: usize,
    /// Number of entries in the constraint Jacobian.
    pub jaclen: usize,
    /// Number of entries in the Hessian of the Lagrangian.
    pub hesslen: usize,
    pub indexing: IndexStyle,
}

impl StructuralInfo {
    /// Dimensions of a problem with fully dense Jacobian and Hessian.
    pub fn dense(xlen: usize, glen: usize) -> Self {
        Self {
            xlen,
            glen,
            jaclen: glen * xlen,
            hesslen: xlen * xlen,
            indexing: IndexStyle::C,
        }
    }
}

/// Which starting values the solver wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartingPointRequest {
    /// Primal variables.
    pub x: bool,
    /// Bound multipliers.
    pub z: bool,
    /// Constraint multipliers.
    pub lambda: bool,
}

impl StartingPointRequest {
    pub fn primal_only() -> Self {
        Self {
            x: true,
            ..Self::default()
        }
    }
}

/// The two phases of the constraint Jacobian callback.
#[derive(Debug)]
pub enum JacobianRequest<'a> {
    /// Fill row and column indices of the non-zero entries.
    Structure {
        rows: &'a mut [Index],
        cols: &'a mut [Index],
    },
    /// Fill the entry values at `x`.
    Values {
        new_x: bool,
        x: &'a [Number],
        values: &'a mut [Number],
    },
}

/// Progress reported by the solver once per iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationInfo {
    pub iteration: usize,
    pub objective: Number,
    /// Primal infeasibility.
    pub inf_pr: Number,
    /// Dual infeasibility.
    pub inf_du: Number,
    /// Barrier parameter.
    pub mu: Number,
}

/// A nonlinear program as seen by the solver.
pub trait Tnlp {
    fn query_structure(&mut self) -> BridgeResult<StructuralInfo>;

    /// Fill variable bounds (length xlen) and constraint bounds (length glen).
    fn query_bounds(
        &mut self,
        x_l: &mut [Number],
        x_u: &mut [Number],
        g_l: &mut [Number],
        g_u: &mut [Number],
    ) -> BridgeResult<()>;

    /// Fill the requested starting values into `x`.
    fn query_start(&mut self, request: StartingPointRequest, x: &mut [Number]) -> BridgeResult<()>;

    fn evaluate_objective(&mut self, new_x: bool, x: &[Number]) -> BridgeResult<Number>;

    fn evaluate_constraints(&mut self, new_x: bool, x: &[Number], g: &mut [Number])
        -> BridgeResult<()>;

    fn evaluate_objective_gradient(
        &mut self,
        new_x: bool,
        x: &[Number],
        grad: &mut [Number],
    ) -> BridgeResult<()>;

    /// Structure phase of the Jacobian callback. Never touches values.
    fn query_sparsity_pattern(&mut self, rows: &mut [Index], cols: &mut [Index])
        -> BridgeResult<()>;

    /// Value phase of the Jacobian callback.
    fn evaluate_jacobian_values(
        &mut self,
        new_x: bool,
        x: &[Number],
        values: &mut [Number],
    ) -> BridgeResult<()>;

    /// Multiplexed Jacobian callback, dispatching on the requested phase.
    fn evaluate_constraint_jacobian(&mut self, request: JacobianRequest<'_>) -> BridgeResult<()> {
        match request {
            JacobianRequest::Structure { rows, cols } => self.query_sparsity_pattern(rows, cols),
            JacobianRequest::Values { new_x, x, values } => {
                self.evaluate_jacobian_values(new_x, x, values)
            }
        }
    }

    /// Called once per iteration. Returning false asks the solver to stop.
    fn intermediate(&mut self, _info: IterationInfo) -> bool {
        true
    }

    /// Called exactly once when the solver terminates, on every terminal path.
    fn finalize(&mut self, code: i32, x: &[Number], g: &[Number], fval: Number);
}
