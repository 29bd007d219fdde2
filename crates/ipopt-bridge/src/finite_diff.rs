//! Finite-difference approximation of the objective gradient.
//!
//! Used when the problem supplies no gradient callable. Steps are scaled by the
//! magnitude of each variable and kept inside the variable bounds, shrinking
//! when the box is narrower than the step. Fixed variables get a zero partial.

use ndarray::{Array1, ArrayView1};

use crate::error::BridgeResult;

/// Square root of double precision machine epsilon, the standard step factor for
/// forward differences.
pub const EPSILON_SQRT: f64 = 0.000000014901161193847656;

/// Cubic root of double precision machine epsilon, the standard step factor for
/// central differences.
pub const EPSILON_CBRT: f64 = 0.0000060554544523933395;

/// Differentiation scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    /// Forward (or backward, near an upper bound) difference, one extra
    /// evaluation per variable.
    TwoPoint,
    /// Central difference, two extra evaluations per variable.
    #[default]
    ThreePoint,
}

/// Variable bounds used to keep perturbed points feasible.
#[derive(Debug, Clone, Copy)]
pub struct Bounds<'a> {
    pub lower: &'a [f64],
    pub upper: &'a [f64],
}

/// Approximate the gradient of `f` at `x` into `grad`.
///
/// `f0` is `f(x)`, which the two-point scheme needs and callers usually have
/// already. `grad` must have the length of `x`.
pub fn objective_gradient<F>(
    mut f: F,
    x: ArrayView1<'_, f64>,
    f0: f64,
    bounds: Option<Bounds<'_>>,
    scheme: Scheme,
    grad: &mut [f64],
) -> BridgeResult<()>
where
    F: FnMut(ArrayView1<'_, f64>) -> BridgeResult<f64>,
{
    let mut point: Array1<f64> = x.to_owned();

    for j in 0..x.len() {
        let xj = x[j];
        let (lo, hi) = match bounds {
            Some(b) => (b.lower[j], b.upper[j]),
            None => (f64::NEG_INFINITY, f64::INFINITY),
        };
        let upper_dist = (hi - xj).max(0.0);
        let lower_dist = (xj - lo).max(0.0);

        if upper_dist == 0.0 && lower_dist == 0.0 {
            // fixed variable
            grad[j] = 0.0;
            continue;
        }

        let mut eval_at = |offset: f64| {
            point[j] = (xj + offset).max(lo).min(hi);
            let value = f(point.view());
            (point[j] - xj, value)
        };

        grad[j] = match scheme {
            Scheme::TwoPoint => {
                let step = EPSILON_SQRT * xj.abs().max(1.0);
                let step = if step <= upper_dist {
                    step
                } else if step <= lower_dist {
                    -step
                } else if upper_dist >= lower_dist {
                    upper_dist
                } else {
                    -lower_dist
                };
                let (h, f1) = eval_at(step);
                (f1? - f0) / h
            }
            Scheme::ThreePoint => {
                let step = EPSILON_CBRT * xj.abs().max(1.0);
                let min_dist = upper_dist.min(lower_dist);

                // one-sided second-order difference pointing into the box,
                // unless a shorter central step fits
                let one_sided = if step <= min_dist {
                    None
                } else if upper_dist >= lower_dist {
                    Some(step.min(0.5 * upper_dist))
                } else {
                    Some(-step.min(0.5 * lower_dist))
                };

                match one_sided {
                    Some(h) if h.abs() > min_dist => {
                        let (_, f1) = eval_at(h);
                        let f1 = f1?;
                        let (_, f2) = eval_at(2.0 * h);
                        (-3.0 * f0 + 4.0 * f1 - f2?) / (2.0 * h)
                    }
                    _ => {
                        let step = step.min(min_dist);
                        let (h_up, f_up) = eval_at(step);
                        let f_up = f_up?;
                        let (h_down, f_down) = eval_at(-step);
                        (f_up - f_down?) / (h_up - h_down)
                    }
                }
            }
        };

        point[j] = xj;
    }

    Ok(())
}
