//! # ipopt-bridge
//!
//! Solve nonlinear programs with IPOPT from plain Rust closures and arrays.
//!
//! A problem is described by four callables (objective, objective gradient,
//! constraints, constraint Jacobian), bounds for variables and constraints, and
//! a starting point:
//!
//! ```text
//! minimize    f(x)                 x ∈ R^n
//! subject to  glimlo ≤ g(x) ≤ glimhi
//!             xlimlo ≤ x    ≤ xlimhi
//! ```
//!
//! Callables receive a read-only view of the current point and may return any
//! [`HostValue`]: a number, or an `ndarray`/`Vec` of `f64`, `f32`, `i64` or
//! `i32`. Results are checked strictly when they are copied into solver buffers:
//! the element type must be `f64`, the data must be contiguous row-major, and it
//! must be at least as long as the buffer. Any error, including one returned by
//! a callable, ends the solve and is returned from [`run_with`].
//!
//! The Jacobian is always treated as dense and row-major. The Hessian is always
//! approximated by limited-memory quasi-Newton updates. Without a gradient
//! callable the gradient is approximated by finite differences; without a
//! Jacobian callable IPOPT approximates it by finite differences.
//!
//! ## Modules
//!
//! - [`host`] / [`bridge`]: host values and copies into solver buffers
//! - [`problem`]: problem definition and builder
//! - [`adapter`]: the callback protocol implementation over a problem
//! - [`runner`]: solver application trait and solve driver
//! - [`options`] / [`config`]: option text and TOML configuration
//! - `ipopt` (feature `ipopt`): the IPOPT backend
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "ipopt")]
//! # fn main() -> Result<(), ipopt_bridge::BridgeError> {
//! use ipopt_bridge::{minimize, ProblemDefinition};
//!
//! // minimize (x0 - 1)^2 + (x1 - 2)^2 subject to x0 + x1 <= 2
//! let problem = ProblemDefinition::builder()
//!     .objective(|_, x| Ok((x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2)))
//!     .gradient(|_, x| Ok(vec![2.0 * (x[0] - 1.0), 2.0 * (x[1] - 2.0)]))
//!     .constraints(|_, x| Ok(vec![x[0] + x[1]]))
//!     .jacobian(|_, _| Ok(vec![1.0, 1.0]))
//!     .start(vec![0.0, 0.0])
//!     .variable_bounds(vec![-10.0, -10.0], vec![10.0, 10.0])
//!     .constraint_bounds(vec![-1e19], vec![2.0])
//!     .build()?;
//!
//! let result = minimize(problem, &["print_level 0"])?;
//! println!("{} at {}: f = {}", result.message, result.xval, result.fval);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ipopt"))]
//! # fn main() {}
//! ```

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod finite_diff;
pub mod host;
#[cfg(feature = "ipopt")]
pub mod ipopt;
pub mod options;
pub mod problem;
pub mod protocol;
pub mod runner;
pub mod status;

pub use adapter::ProblemAdapter;
pub use config::{load_config, SolverConfig};
pub use error::{BridgeError, BridgeResult};
pub use host::{DType, HostArray, HostValue};
pub use problem::{ProblemBuilder, ProblemDefinition};
pub use protocol::Tnlp;
pub use runner::{minimize_with, run_with, Application};
pub use status::{ResultRecord, SolverReturn};

#[cfg(feature = "ipopt")]
pub use ipopt::IpoptApplication;
#[cfg(feature = "ipopt")]
pub use runner::{minimize, run};
