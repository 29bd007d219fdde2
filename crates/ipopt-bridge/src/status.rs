//! Solver termination status and the result record produced by finalize.

use std::fmt;

use ndarray::Array1;

/// Termination status reported to finalize.
///
/// Numeric codes follow the solver's `SolverReturn` enumeration. Any code not
/// listed here maps to [`SolverReturn::Unassigned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SolverReturn {
    Success = 0,
    MaxiterExceeded = 1,
    CputimeExceeded = 2,
    StopAtTinyStep = 3,
    StopAtAcceptablePoint = 4,
    LocalInfeasibility = 5,
    UserRequestedStop = 6,
    FeasiblePointFound = 7,
    DivergingIterates = 8,
    RestorationFailure = 9,
    ErrorInStepComputation = 10,
    InvalidNumberDetected = 11,
    TooFewDegreesOfFreedom = 12,
    InvalidOption = 13,
    OutOfMemory = 14,
    InternalError = 15,
    Unassigned = 16,
}

impl SolverReturn {
    pub fn from_code(code: i32) -> Self {
        use SolverReturn::*;
        match code {
            0 => Success,
            1 => MaxiterExceeded,
            2 => CputimeExceeded,
            3 => StopAtTinyStep,
            4 => StopAtAcceptablePoint,
            5 => LocalInfeasibility,
            6 => UserRequestedStop,
            7 => FeasiblePointFound,
            8 => DivergingIterates,
            9 => RestorationFailure,
            10 => ErrorInStepComputation,
            11 => InvalidNumberDetected,
            12 => TooFewDegreesOfFreedom,
            13 => InvalidOption,
            14 => OutOfMemory,
            15 => InternalError,
            _ => Unassigned,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Symbolic name, e.g. `"MAXITER_EXCEEDED"`.
    pub fn message(self) -> &'static str {
        use SolverReturn::*;
        match self {
            Success => "SUCCESS",
            MaxiterExceeded => "MAXITER_EXCEEDED",
            CputimeExceeded => "CPUTIME_EXCEEDED",
            StopAtTinyStep => "STOP_AT_TINY_STEP",
            StopAtAcceptablePoint => "STOP_AT_ACCEPTABLE_POINT",
            LocalInfeasibility => "LOCAL_INFEASIBILITY",
            UserRequestedStop => "USER_REQUESTED_STOP",
            FeasiblePointFound => "FEASIBLE_POINT_FOUND",
            DivergingIterates => "DIVERGING_ITERATES",
            RestorationFailure => "RESTORATION_FAILURE",
            ErrorInStepComputation => "ERROR_IN_STEP_COMPUTATION",
            InvalidNumberDetected => "INVALID_NUMBER_DETECTED",
            TooFewDegreesOfFreedom => "TOO_FEW_DEGREES_OF_FREEDOM",
            InvalidOption => "INVALID_OPTION",
            OutOfMemory => "OUT_OF_MEMORY",
            InternalError => "INTERNAL_ERROR",
            Unassigned => "UNASSIGNED",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, SolverReturn::Success)
    }
}

impl fmt::Display for SolverReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of one solve, written once by finalize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub status: SolverReturn,
    pub success: bool,
    pub message: String,
    /// Objective value at `xval`.
    pub fval: f64,
    /// Solution vector (length xcount).
    pub xval: Array1<f64>,
    /// Constraint values at `xval` (length gcount).
    pub gval: Array1<f64>,
    /// Last iteration count reported by the solver, 0 if it never reported one.
    pub iterations: usize,
}

impl ResultRecord {
    /// Build a record from a raw status code and owned copies of the final vectors.
    pub fn new(code: i32, fval: f64, xval: Array1<f64>, gval: Array1<f64>) -> Self {
        let status = SolverReturn::from_code(code);
        Self {
            status,
            success: status.is_success(),
            message: status.message().to_string(),
            fval,
            xval,
            gval,
            iterations: 0,
        }
    }
}
