//! IPOPT backend over the C interface.
//!
//! The C interface has no starting-point or finalize callbacks, so
//! [`IpoptApplication`] queries bounds and start before the solve and reports
//! the final point to [`Tnlp::finalize`] after `IpoptSolve` returns. An error
//! raised inside a callback makes that callback report failure to IPOPT and
//! stops the solve at the next iteration; it is then returned from
//! [`Application::optimize`].

use std::any::Any;
use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use ipopt_bridge_sys::{
    AddIpoptIntOption, AddIpoptNumOption, AddIpoptStrOption, ApplicationReturnStatus,
    CreateIpoptProblem, FreeIpoptProblem, Index, IpoptProblem, IpoptSolve, Number,
    SetIntermediateCallback, UserDataPtr, C_STYLE, FORTRAN_STYLE,
};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::options::{self, OptionValue};
use crate::protocol::{IndexStyle, IterationInfo, StartingPointRequest, StructuralInfo, Tnlp};
use crate::runner::Application;
use crate::status::SolverReturn;

/// Largest dimension accepted from the solver when building callback slices.
const MAX_PROBLEM_SIZE: usize = 10_000_000;

impl From<ApplicationReturnStatus> for SolverReturn {
    fn from(status: ApplicationReturnStatus) -> Self {
        use ApplicationReturnStatus as A;
        match status {
            A::SolveSucceeded => SolverReturn::Success,
            A::SolvedToAcceptableLevel => SolverReturn::StopAtAcceptablePoint,
            A::InfeasibleProblemDetected => SolverReturn::LocalInfeasibility,
            A::SearchDirectionBecomesTooSmall => SolverReturn::StopAtTinyStep,
            A::DivergingIterates => SolverReturn::DivergingIterates,
            A::UserRequestedStop => SolverReturn::UserRequestedStop,
            A::FeasiblePointFound => SolverReturn::FeasiblePointFound,
            A::MaximumIterationsExceeded => SolverReturn::MaxiterExceeded,
            A::RestorationFailed => SolverReturn::RestorationFailure,
            A::ErrorInStepComputation => SolverReturn::ErrorInStepComputation,
            A::MaximumCpuTimeExceeded | A::MaximumWallTimeExceeded => {
                SolverReturn::CputimeExceeded
            }
            A::NotEnoughDegreesOfFreedom => SolverReturn::TooFewDegreesOfFreedom,
            A::InvalidOption => SolverReturn::InvalidOption,
            A::InvalidNumberDetected => SolverReturn::InvalidNumberDetected,
            A::InsufficientMemory => SolverReturn::OutOfMemory,
            A::InvalidProblemDefinition
            | A::UnrecoverableException
            | A::NonIpoptExceptionThrown
            | A::InternalError => SolverReturn::InternalError,
        }
    }
}

/// IPOPT through its C interface.
#[derive(Debug, Default)]
pub struct IpoptApplication {
    rethrow: bool,
    /// Options in the order they are applied; later values clobber earlier ones.
    options: Vec<(String, String)>,
}

impl IpoptApplication {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version() -> (i32, i32, i32) {
        ipopt_bridge_sys::version()
    }
}

impl Application for IpoptApplication {
    fn rethrow_host_faults(&mut self, enabled: bool) {
        self.rethrow = enabled;
    }

    fn initialize(&mut self, options: &str) -> BridgeResult<()> {
        self.options = options::parse_pairs(options)?;
        debug!(count = self.options.len(), "parsed option text");
        Ok(())
    }

    fn set_string_option(&mut self, key: &str, value: &str) -> BridgeResult<()> {
        self.options.push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn optimize(&mut self, problem: &mut dyn Tnlp) -> BridgeResult<SolverReturn> {
        let info = problem.query_structure()?;
        let (n, m) = (info.xlen, info.glen);

        let mut x_l = vec![0.0; n];
        let mut x_u = vec![0.0; n];
        let mut g_l = vec![0.0; m];
        let mut g_u = vec![0.0; m];
        problem.query_bounds(&mut x_l, &mut x_u, &mut g_l, &mut g_u)?;

        let handle = ProblemHandle::create(&info, &x_l, &x_u, &g_l, &g_u)?;
        for (key, value) in &self.options {
            handle.add_option(key, value)?;
        }
        // SAFETY: the handle is valid and the callback matches the declared signature
        if !unsafe { SetIntermediateCallback(handle.raw, Some(intermediate_callback)) } {
            return Err(BridgeError::Solver(
                "failed to install the intermediate callback".to_string(),
            ));
        }

        let mut x = vec![0.0; n];
        problem.query_start(StartingPointRequest::primal_only(), &mut x)?;

        let mut g = vec![0.0; m];
        let mut mult_g = vec![0.0; m];
        let mut mult_x_l = vec![0.0; n];
        let mut mult_x_u = vec![0.0; n];
        let mut obj_val = 0.0;

        info!(n, m, "starting IPOPT solve");
        let mut context = CallbackContext {
            tnlp: &mut *problem,
            fault: None,
        };
        // SAFETY: all buffers have the lengths declared at creation and outlive the
        // call; context stays alive and unmoved until IpoptSolve returns
        let raw_status = unsafe {
            IpoptSolve(
                handle.raw,
                x.as_mut_ptr(),
                g.as_mut_ptr(),
                &mut obj_val,
                mult_g.as_mut_ptr(),
                mult_x_l.as_mut_ptr(),
                mult_x_u.as_mut_ptr(),
                &mut context as *mut CallbackContext<'_> as UserDataPtr,
            )
        };
        let fault = context.fault.take();
        drop(handle);

        let status = match ApplicationReturnStatus::from_raw(raw_status) {
            Some(status) => SolverReturn::from(status),
            None => {
                warn!(raw_status, "unknown IPOPT return status");
                SolverReturn::Unassigned
            }
        };

        let status = match fault {
            Some(Fault::Panic(payload)) => panic::resume_unwind(payload),
            Some(Fault::Error(err)) if self.rethrow => return Err(err),
            Some(Fault::Error(err)) => {
                warn!(error = %err, "callback failed, reporting internal error");
                SolverReturn::InternalError
            }
            None => status,
        };

        debug!(%status, raw_status, "IPOPT returned");
        problem.finalize(status.code(), &x, &g, obj_val);
        Ok(status)
    }
}

/// Owned `IpoptProblem`, freed on drop.
struct ProblemHandle {
    raw: IpoptProblem,
}

impl ProblemHandle {
    fn create(
        info: &StructuralInfo,
        x_l: &[Number],
        x_u: &[Number],
        g_l: &[Number],
        g_u: &[Number],
    ) -> BridgeResult<Self> {
        let dims = [info.xlen, info.glen, info.jaclen, info.hesslen];
        if dims.iter().any(|&d| d > MAX_PROBLEM_SIZE) {
            return Err(BridgeError::InvalidProblem(format!(
                "problem dimensions {dims:?} exceed {MAX_PROBLEM_SIZE}"
            )));
        }
        let index_style = match info.indexing {
            IndexStyle::C => C_STYLE,
            IndexStyle::Fortran => FORTRAN_STYLE,
        };

        // SAFETY: bound slices have lengths n and m; IPOPT copies them
        let raw = unsafe {
            CreateIpoptProblem(
                info.xlen as Index,
                x_l.as_ptr(),
                x_u.as_ptr(),
                info.glen as Index,
                g_l.as_ptr(),
                g_u.as_ptr(),
                info.jaclen as Index,
                info.hesslen as Index,
                index_style,
                eval_f_callback,
                eval_g_callback,
                eval_grad_f_callback,
                eval_jac_g_callback,
                eval_h_callback,
            )
        };

        if raw.is_null() {
            return Err(BridgeError::Solver(
                "failed to create IPOPT problem".to_string(),
            ));
        }
        Ok(Self { raw })
    }

    /// Set an option with the typed setter [`options::classify`] picks.
    fn add_option(&self, key: &str, value: &str) -> BridgeResult<()> {
        let key_c = c_string(key)?;
        let value_c = c_string(value)?;

        // SAFETY: the handle is valid and both strings are NUL-terminated
        let accepted = unsafe {
            match options::classify(key, value) {
                OptionValue::Int(int) => AddIpoptIntOption(self.raw, key_c.as_ptr(), int),
                OptionValue::Num(num) => {
                    // integer options missing from the table still get through
                    AddIpoptNumOption(self.raw, key_c.as_ptr(), num)
                        || value.parse::<Index>().is_ok_and(|int| {
                            AddIpoptIntOption(self.raw, key_c.as_ptr(), int)
                        })
                }
                OptionValue::Str(_) => {
                    AddIpoptStrOption(self.raw, key_c.as_ptr(), value_c.as_ptr())
                }
            }
        };

        if !accepted {
            return Err(BridgeError::Solver(format!(
                "IPOPT rejected option {key} = {value}"
            )));
        }
        debug!(key, value, "set IPOPT option");
        Ok(())
    }
}

impl Drop for ProblemHandle {
    fn drop(&mut self) {
        // SAFETY: raw came from CreateIpoptProblem and is freed once
        unsafe { FreeIpoptProblem(self.raw) };
    }
}

fn c_string(s: &str) -> BridgeResult<CString> {
    CString::new(s).map_err(|_| BridgeError::Solver(format!("option text {s:?} contains NUL")))
}

// ============================================================================
// CALLBACK TRAMPOLINES
// ============================================================================

enum Fault {
    Error(BridgeError),
    Panic(Box<dyn Any + Send>),
}

/// State shared with the trampolines through `user_data`.
struct CallbackContext<'a> {
    tnlp: &'a mut dyn Tnlp,
    /// First failure raised by a callback. Once set, every callback fails.
    fault: Option<Fault>,
}

/// Run `f` against the problem behind `user_data`, recording any failure.
fn with_context<F>(user_data: UserDataPtr, f: F) -> bool
where
    F: FnOnce(&mut dyn Tnlp) -> BridgeResult<()>,
{
    if user_data.is_null() {
        return false;
    }
    // SAFETY: user_data is the CallbackContext passed to IpoptSolve, alive for the
    // whole solve and not otherwise borrowed while IPOPT runs
    let context = unsafe { &mut *(user_data as *mut CallbackContext<'_>) };
    if context.fault.is_some() {
        return false;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *context.tnlp))) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            debug!(error = %err, "callback failed");
            context.fault = Some(Fault::Error(err));
            false
        }
        Err(payload) => {
            context.fault = Some(Fault::Panic(payload));
            false
        }
    }
}

fn dimension(len: Index) -> Option<usize> {
    usize::try_from(len).ok().filter(|&len| len <= MAX_PROBLEM_SIZE)
}

/// # Safety
/// `ptr` must be null or valid for `len` reads for the duration of the callback.
unsafe fn input<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    match (ptr.is_null(), len) {
        (_, 0) => Some(&[]),
        (true, _) => None,
        (false, _) => Some(slice::from_raw_parts(ptr, len)),
    }
}

/// # Safety
/// `ptr` must be null or valid for `len` writes for the duration of the callback.
unsafe fn output<'a, T>(ptr: *mut T, len: usize) -> Option<&'a mut [T]> {
    match (ptr.is_null(), len) {
        (_, 0) => Some(&mut []),
        (true, _) => None,
        (false, _) => Some(slice::from_raw_parts_mut(ptr, len)),
    }
}

extern "C" fn eval_f_callback(
    n: Index,
    x: *const Number,
    new_x: bool,
    obj_value: *mut Number,
    user_data: UserDataPtr,
) -> bool {
    let (Some(n), false) = (dimension(n), obj_value.is_null()) else {
        return false;
    };
    // SAFETY: IPOPT passes x with n entries
    let Some(x) = (unsafe { input(x, n) }) else {
        return false;
    };

    with_context(user_data, |tnlp| {
        let value = tnlp.evaluate_objective(new_x, x)?;
        // SAFETY: obj_value is non-null and points to a single Number
        unsafe { *obj_value = value };
        Ok(())
    })
}

extern "C" fn eval_grad_f_callback(
    n: Index,
    x: *const Number,
    new_x: bool,
    grad_f: *mut Number,
    user_data: UserDataPtr,
) -> bool {
    let Some(n) = dimension(n) else {
        return false;
    };
    // SAFETY: IPOPT passes x and grad_f with n entries
    let (Some(x), Some(grad)) = (unsafe { input(x, n) }, unsafe { output(grad_f, n) }) else {
        return false;
    };

    with_context(user_data, |tnlp| tnlp.evaluate_objective_gradient(new_x, x, grad))
}

extern "C" fn eval_g_callback(
    n: Index,
    x: *const Number,
    new_x: bool,
    m: Index,
    g: *mut Number,
    user_data: UserDataPtr,
) -> bool {
    let (Some(n), Some(m)) = (dimension(n), dimension(m)) else {
        return false;
    };
    // SAFETY: IPOPT passes x with n entries and g with m entries
    let (Some(x), Some(g)) = (unsafe { input(x, n) }, unsafe { output(g, m) }) else {
        return false;
    };

    with_context(user_data, |tnlp| tnlp.evaluate_constraints(new_x, x, g))
}

#[allow(clippy::too_many_arguments)]
extern "C" fn eval_jac_g_callback(
    n: Index,
    x: *const Number,
    new_x: bool,
    _m: Index,
    nele_jac: Index,
    i_row: *mut Index,
    j_col: *mut Index,
    values: *mut Number,
    user_data: UserDataPtr,
) -> bool {
    let (Some(n), Some(nele)) = (dimension(n), dimension(nele_jac)) else {
        return false;
    };

    if values.is_null() {
        // SAFETY: in the structure phase IPOPT passes index arrays of nele_jac entries
        let (Some(rows), Some(cols)) = (unsafe { output(i_row, nele) }, unsafe {
            output(j_col, nele)
        }) else {
            return false;
        };
        return with_context(user_data, |tnlp| tnlp.query_sparsity_pattern(rows, cols));
    }

    // SAFETY: in the value phase IPOPT passes x with n entries and values with nele_jac
    let (Some(x), Some(values)) = (unsafe { input(x, n) }, unsafe { output(values, nele) }) else {
        return false;
    };
    with_context(user_data, |tnlp| tnlp.evaluate_jacobian_values(new_x, x, values))
}

/// Never called: the Hessian is always approximated.
#[allow(clippy::too_many_arguments)]
extern "C" fn eval_h_callback(
    _n: Index,
    _x: *const Number,
    _new_x: bool,
    _obj_factor: Number,
    _m: Index,
    _lambda: *const Number,
    _new_lambda: bool,
    _nele_hess: Index,
    _i_row: *mut Index,
    _j_col: *mut Index,
    _values: *mut Number,
    user_data: UserDataPtr,
) -> bool {
    with_context(user_data, |_| {
        Err(BridgeError::UnsupportedRequest(
            "exact Hessian requested but hessian_approximation is limited-memory".to_string(),
        ))
    })
}

#[allow(clippy::too_many_arguments)]
extern "C" fn intermediate_callback(
    _alg_mod: Index,
    iter_count: Index,
    obj_value: Number,
    inf_pr: Number,
    inf_du: Number,
    mu: Number,
    _d_norm: Number,
    _regularization_size: Number,
    _alpha_du: Number,
    _alpha_pr: Number,
    _ls_trials: Index,
    user_data: UserDataPtr,
) -> bool {
    let info = IterationInfo {
        iteration: usize::try_from(iter_count).unwrap_or_default(),
        objective: obj_value,
        inf_pr,
        inf_du,
        mu,
    };

    let mut proceed = true;
    let ran = with_context(user_data, |tnlp| {
        proceed = tnlp.intermediate(info);
        Ok(())
    });
    ran && proceed
}
