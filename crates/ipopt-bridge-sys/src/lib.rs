//! Raw FFI declarations for the IPOPT C interface (`IpStdCInterface.h`).
//!
//! IPOPT is an open-source software package for large-scale nonlinear optimization.
//! It implements an interior-point line-search filter method.
//!
//! This crate only declares the C symbols and the status codes. The safe layer,
//! including the callback trampolines, lives in `ipopt-bridge` behind its `ipopt`
//! feature.
//!
//! The declarations target IPOPT 3.14 or newer, where the C interface uses C99
//! `bool` for flags and callback results.
//!
//! # Building
//!
//! This crate links against IPOPT libraries from:
//! 1. `$IPOPT_DIR/lib`
//! 2. `vendor/local/lib/` at the workspace root
//! 3. System IPOPT via pkg-config (fallback)
//!
//! # Reference
//!
//! Wächter, A., & Biegler, L. T. (2006). On the implementation of an interior-point
//! filter line-search algorithm for large-scale nonlinear programming.
//! *Mathematical Programming*, 106(1), 25-57.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::os::raw::{c_char, c_double, c_int, c_void};

// ============================================================================
// TYPES
// ============================================================================

/// Floating-point number type (matches ipnumber in IPOPT).
pub type Number = c_double;

/// Index type for vectors/matrices (matches ipindex in IPOPT).
pub type Index = c_int;

/// Opaque pointer to IPOPT problem structure.
#[repr(C)]
pub struct IpoptProblemInfo {
    _private: [u8; 0],
}

/// Pointer to an IPOPT problem.
pub type IpoptProblem = *mut IpoptProblemInfo;

/// User data pointer passed to callbacks.
pub type UserDataPtr = *mut c_void;

/// Index style for sparse matrix triplets: 0-based.
pub const C_STYLE: Index = 0;

/// Index style for sparse matrix triplets: 1-based.
pub const FORTRAN_STYLE: Index = 1;

// ============================================================================
// RETURN CODES
// ============================================================================

/// Return codes from IpoptSolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ApplicationReturnStatus {
    SolveSucceeded = 0,
    SolvedToAcceptableLevel = 1,
    InfeasibleProblemDetected = 2,
    SearchDirectionBecomesTooSmall = 3,
    DivergingIterates = 4,
    UserRequestedStop = 5,
    FeasiblePointFound = 6,

    MaximumIterationsExceeded = -1,
    RestorationFailed = -2,
    ErrorInStepComputation = -3,
    MaximumCpuTimeExceeded = -4,
    MaximumWallTimeExceeded = -5,

    NotEnoughDegreesOfFreedom = -10,
    InvalidProblemDefinition = -11,
    InvalidOption = -12,
    InvalidNumberDetected = -13,

    UnrecoverableException = -100,
    NonIpoptExceptionThrown = -101,
    InsufficientMemory = -102,
    InternalError = -199,
}

impl ApplicationReturnStatus {
    /// Convert a raw code returned by [`IpoptSolve`].
    ///
    /// Returns `None` for codes this crate does not know about.
    pub fn from_raw(code: c_int) -> Option<Self> {
        use ApplicationReturnStatus::*;
        let status = match code {
            0 => SolveSucceeded,
            1 => SolvedToAcceptableLevel,
            2 => InfeasibleProblemDetected,
            3 => SearchDirectionBecomesTooSmall,
            4 => DivergingIterates,
            5 => UserRequestedStop,
            6 => FeasiblePointFound,
            -1 => MaximumIterationsExceeded,
            -2 => RestorationFailed,
            -3 => ErrorInStepComputation,
            -4 => MaximumCpuTimeExceeded,
            -5 => MaximumWallTimeExceeded,
            -10 => NotEnoughDegreesOfFreedom,
            -11 => InvalidProblemDefinition,
            -12 => InvalidOption,
            -13 => InvalidNumberDetected,
            -100 => UnrecoverableException,
            -101 => NonIpoptExceptionThrown,
            -102 => InsufficientMemory,
            -199 => InternalError,
            _ => return None,
        };
        Some(status)
    }
}

// ============================================================================
// CALLBACK FUNCTION TYPES
// ============================================================================

/// Callback for evaluating objective function f(x).
///
/// # Arguments
/// * `n` - Number of variables
/// * `x` - Variable values (length n)
/// * `new_x` - True if x changed since last call
/// * `obj_value` - Output: objective value f(x)
/// * `user_data` - User data pointer
///
/// # Returns
/// True on success, false on evaluation error.
pub type Eval_F_CB = extern "C" fn(
    n: Index,
    x: *const Number,
    new_x: bool,
    obj_value: *mut Number,
    user_data: UserDataPtr,
) -> bool;

/// Callback for evaluating gradient of objective function ∇f(x).
pub type Eval_Grad_F_CB = extern "C" fn(
    n: Index,
    x: *const Number,
    new_x: bool,
    grad_f: *mut Number,
    user_data: UserDataPtr,
) -> bool;

/// Callback for evaluating constraint functions g(x).
pub type Eval_G_CB = extern "C" fn(
    n: Index,
    x: *const Number,
    new_x: bool,
    m: Index,
    g: *mut Number,
    user_data: UserDataPtr,
) -> bool;

/// Callback for evaluating Jacobian of constraints.
///
/// Called in two modes:
/// 1. `values == NULL`: Fill iRow and jCol with sparsity structure
/// 2. `values != NULL`: Fill values with Jacobian entries
pub type Eval_Jac_G_CB = extern "C" fn(
    n: Index,
    x: *const Number,
    new_x: bool,
    m: Index,
    nele_jac: Index,
    iRow: *mut Index,
    jCol: *mut Index,
    values: *mut Number,
    user_data: UserDataPtr,
) -> bool;

/// Callback for evaluating Hessian of Lagrangian.
///
/// Never invoked when `hessian_approximation` is `limited-memory`, but the C
/// interface still requires a function pointer.
pub type Eval_H_CB = extern "C" fn(
    n: Index,
    x: *const Number,
    new_x: bool,
    obj_factor: Number,
    m: Index,
    lambda: *const Number,
    new_lambda: bool,
    nele_hess: Index,
    iRow: *mut Index,
    jCol: *mut Index,
    values: *mut Number,
    user_data: UserDataPtr,
) -> bool;

/// Callback for intermediate iteration info.
///
/// Called once per iteration. Return false to terminate optimization.
pub type Intermediate_CB = extern "C" fn(
    alg_mod: Index,
    iter_count: Index,
    obj_value: Number,
    inf_pr: Number,
    inf_du: Number,
    mu: Number,
    d_norm: Number,
    regularization_size: Number,
    alpha_du: Number,
    alpha_pr: Number,
    ls_trials: Index,
    user_data: UserDataPtr,
) -> bool;

// ============================================================================
// IPOPT C INTERFACE FUNCTIONS
// ============================================================================

extern "C" {
    /// Create a new IPOPT problem.
    ///
    /// # Arguments
    /// * `n` - Number of variables
    /// * `x_L` - Lower bounds on variables (length n)
    /// * `x_U` - Upper bounds on variables (length n)
    /// * `m` - Number of constraints
    /// * `g_L` - Lower bounds on constraints (length m)
    /// * `g_U` - Upper bounds on constraints (length m)
    /// * `nele_jac` - Number of non-zeros in constraint Jacobian
    /// * `nele_hess` - Number of non-zeros in Hessian of Lagrangian
    /// * `index_style` - 0 for C-style (0-based), 1 for Fortran-style (1-based)
    ///
    /// # Returns
    /// Pointer to problem, or NULL on error.
    pub fn CreateIpoptProblem(
        n: Index,
        x_L: *const Number,
        x_U: *const Number,
        m: Index,
        g_L: *const Number,
        g_U: *const Number,
        nele_jac: Index,
        nele_hess: Index,
        index_style: Index,
        eval_f: Eval_F_CB,
        eval_g: Eval_G_CB,
        eval_grad_f: Eval_Grad_F_CB,
        eval_jac_g: Eval_Jac_G_CB,
        eval_h: Eval_H_CB,
    ) -> IpoptProblem;

    /// Free an IPOPT problem.
    pub fn FreeIpoptProblem(ipopt_problem: IpoptProblem);

    /// Add a string option. Returns false if the option could not be set.
    pub fn AddIpoptStrOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: *const c_char,
    ) -> bool;

    /// Add a numeric option. Returns false if the option could not be set.
    pub fn AddIpoptNumOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: Number,
    ) -> bool;

    /// Add an integer option. Returns false if the option could not be set.
    pub fn AddIpoptIntOption(
        ipopt_problem: IpoptProblem,
        keyword: *const c_char,
        val: Index,
    ) -> bool;

    /// Set intermediate callback.
    pub fn SetIntermediateCallback(
        ipopt_problem: IpoptProblem,
        intermediate_cb: Option<Intermediate_CB>,
    ) -> bool;

    /// Solve the optimization problem.
    ///
    /// # Arguments
    /// * `ipopt_problem` - Problem to solve
    /// * `x` - Input: starting point; Output: optimal solution (length n)
    /// * `g` - Output: constraint values at solution (length m), or NULL
    /// * `obj_val` - Output: objective value at solution, or NULL
    /// * `mult_g` - Input/Output: constraint multipliers (length m), or NULL
    /// * `mult_x_L` - Input/Output: lower bound multipliers (length n), or NULL
    /// * `mult_x_U` - Input/Output: upper bound multipliers (length n), or NULL
    /// * `user_data` - User data passed to callbacks
    ///
    /// # Returns
    /// Raw `ApplicationReturnStatus` code, see [`ApplicationReturnStatus::from_raw`].
    pub fn IpoptSolve(
        ipopt_problem: IpoptProblem,
        x: *mut Number,
        g: *mut Number,
        obj_val: *mut Number,
        mult_g: *mut Number,
        mult_x_L: *mut Number,
        mult_x_U: *mut Number,
        user_data: UserDataPtr,
    ) -> c_int;

    /// Get IPOPT version.
    pub fn GetIpoptVersion(major: *mut c_int, minor: *mut c_int, release: *mut c_int);
}

/// Get IPOPT library version as `(major, minor, release)`.
pub fn version() -> (i32, i32, i32) {
    let mut major = 0;
    let mut minor = 0;
    let mut release = 0;
    unsafe {
        GetIpoptVersion(&mut major, &mut minor, &mut release);
    }
    (major, minor, release)
}
