//! Scripted solver application for driving the callback protocol without IPOPT.
//!
//! `ScriptedApp` runs projected gradient descent inside the variable bounds. It
//! reads `max_iter` and `tol` from the option text (last occurrence wins) and
//! records what the runner configured so tests can inspect it after the
//! application has been dropped.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ipopt_bridge::options::parse_pairs;
use ipopt_bridge::protocol::{IterationInfo, StartingPointRequest};
use ipopt_bridge::{Application, BridgeResult, SolverReturn, Tnlp};

const STEP: f64 = 0.25;

/// What the runner did to the application.
#[derive(Debug, Default)]
pub struct AppLog {
    pub rethrow: bool,
    pub options_text: String,
    /// Parsed option text followed by programmatic options, in order.
    pub options: Vec<(String, String)>,
    pub finalized: bool,
    pub objective_calls: usize,
    pub jacobian_value_calls: usize,
}

impl AppLog {
    /// Value of the last occurrence of `key`.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub struct ScriptedApp {
    log: Rc<RefCell<AppLog>>,
    skip_finalize: bool,
}

impl ScriptedApp {
    pub fn new(log: &Rc<RefCell<AppLog>>) -> Self {
        Self {
            log: Rc::clone(log),
            skip_finalize: false,
        }
    }

    /// An application that returns without ever calling finalize.
    pub fn without_finalize(log: &Rc<RefCell<AppLog>>) -> Self {
        Self {
            skip_finalize: true,
            ..Self::new(log)
        }
    }

    fn numeric_option(&self, key: &str, default: f64) -> f64 {
        self.log
            .borrow()
            .option(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn descend(&mut self, problem: &mut dyn Tnlp) -> BridgeResult<(SolverReturn, Vec<f64>, Vec<f64>, f64)> {
        let info = problem.query_structure()?;
        let (n, m) = (info.xlen, info.glen);

        let (mut x_l, mut x_u) = (vec![0.0; n], vec![0.0; n]);
        let (mut g_l, mut g_u) = (vec![0.0; m], vec![0.0; m]);
        problem.query_bounds(&mut x_l, &mut x_u, &mut g_l, &mut g_u)?;

        let mut x = vec![0.0; n];
        problem.query_start(StartingPointRequest::primal_only(), &mut x)?;

        let approximate_jacobian = self.log.borrow().option("jacobian_approximation")
            == Some("finite-difference-values");
        let mut rows = vec![0; info.jaclen];
        let mut cols = vec![0; info.jaclen];
        problem.query_sparsity_pattern(&mut rows, &mut cols)?;

        let max_iter = self.numeric_option("max_iter", 100.0) as usize;
        let tol = self.numeric_option("tol", 1e-8);

        let mut g = vec![0.0; m];
        let mut grad = vec![0.0; n];
        let mut jac = vec![0.0; info.jaclen];
        let mut f = 0.0;

        for iteration in 0..=max_iter {
            f = problem.evaluate_objective(true, &x)?;
            self.log.borrow_mut().objective_calls += 1;
            problem.evaluate_constraints(false, &x, &mut g)?;
            problem.evaluate_objective_gradient(false, &x, &mut grad)?;
            if !approximate_jacobian {
                problem.evaluate_jacobian_values(false, &x, &mut jac)?;
                self.log.borrow_mut().jacobian_value_calls += 1;
            }

            let projected: f64 = (0..n)
                .map(|j| {
                    let blocked = (x[j] <= x_l[j] && grad[j] > 0.0)
                        || (x[j] >= x_u[j] && grad[j] < 0.0);
                    if blocked {
                        0.0
                    } else {
                        grad[j] * grad[j]
                    }
                })
                .sum::<f64>()
                .sqrt();

            if projected <= tol {
                return Ok((SolverReturn::Success, x, g, f));
            }
            if iteration == max_iter {
                break;
            }

            for j in 0..n {
                x[j] = (x[j] - STEP * grad[j]).clamp(x_l[j], x_u[j]);
            }

            let proceed = problem.intermediate(IterationInfo {
                iteration: iteration + 1,
                objective: f,
                inf_pr: 0.0,
                inf_du: projected,
                mu: 0.0,
            });
            if !proceed {
                return Ok((SolverReturn::UserRequestedStop, x, g, f));
            }
        }

        Ok((SolverReturn::MaxiterExceeded, x, g, f))
    }
}

impl Application for ScriptedApp {
    fn rethrow_host_faults(&mut self, enabled: bool) {
        self.log.borrow_mut().rethrow = enabled;
    }

    fn initialize(&mut self, options: &str) -> BridgeResult<()> {
        let pairs = parse_pairs(options)?;
        let mut log = self.log.borrow_mut();
        log.options_text = options.to_string();
        log.options = pairs;
        Ok(())
    }

    fn set_string_option(&mut self, key: &str, value: &str) -> BridgeResult<()> {
        self.log
            .borrow_mut()
            .options
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn optimize(&mut self, problem: &mut dyn Tnlp) -> BridgeResult<SolverReturn> {
        let rethrow = self.log.borrow().rethrow;
        let (status, x, g, f) = match self.descend(problem) {
            Ok(outcome) => outcome,
            Err(err) if rethrow => return Err(err),
            Err(_) => (SolverReturn::InternalError, Vec::new(), Vec::new(), f64::NAN),
        };

        if !self.skip_finalize {
            problem.finalize(status.code(), &x, &g, f);
            self.log.borrow_mut().finalized = true;
        }
        Ok(status)
    }
}
