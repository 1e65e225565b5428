use std::fmt;

use ndarray::{Array1, Array2};
use ndarray_linalg::{Norm, Solve};
use tracing::{debug, trace};

use crate::core::error::{Error, Result};
use crate::core::traits::EmbeddedManifold;

/// Least-squares objective f(p) = ||r(p)||^2 where r: M → R^m
pub trait ResidualFunction<M: EmbeddedManifold> {
    /// Evaluate residual vector r(p) ∈ R^m
    fn residual(&self, manifold: &M, p: &M::Point) -> Result<Array1<f64>>;

    /// Jacobian J(p) ∈ R^{m×d} with respect to tangent coordinates at p,
    /// where d = manifold.dim()
    ///
    /// Defaults to central finite differences along the exponential map.
    fn jacobian(&self, manifold: &M, p: &M::Point) -> Result<Array2<f64>>
    where
        M: EmbeddedManifold<Vector = Array1<f64>>,
        Self: Sized,
    {
        numerical_jacobian(manifold, self, p, DEFAULT_JACOBIAN_STEP)
    }

    /// Number of residuals
    fn num_residuals(&self) -> usize;

    /// Objective value ||r(p)||^2
    fn cost(&self, manifold: &M, p: &M::Point) -> Result<f64> {
        let r = self.residual(manifold, p)?;
        Ok(r.dot(&r))
    }
}

/// Finite-difference step used by the default Jacobian
pub const DEFAULT_JACOBIAN_STEP: f64 = 1e-6;

/// Central-difference Jacobian of `residual_fn` in tangent coordinates at `p`
///
/// Column k is (r(exp_p(h e_k)) - r(exp_p(-h e_k))) / 2h.
pub fn numerical_jacobian<M, R>(
    manifold: &M,
    residual_fn: &R,
    p: &M::Point,
    step: f64,
) -> Result<Array2<f64>>
where
    M: EmbeddedManifold<Vector = Array1<f64>>,
    R: ResidualFunction<M>,
{
    if !(step > 0.0) || !step.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "finite-difference step must be positive, got {}",
            step
        )));
    }

    let d = manifold.dim();
    let m = residual_fn.num_residuals();
    let mut j = Array2::zeros((m, d));

    for k in 0..d {
        let mut e = Array1::zeros(d);
        e[k] = step;
        let r_plus = residual_fn.residual(manifold, &manifold.exp_unchecked(p, &e))?;
        let r_minus = residual_fn.residual(manifold, &manifold.exp_unchecked(p, &(-&e)))?;
        if r_plus.len() != m || r_minus.len() != m {
            return Err(Error::DimensionMismatch {
                expected: m,
                got: r_plus.len(),
            });
        }
        let column = (r_plus - r_minus) / (2.0 * step);
        j.column_mut(k).assign(&column);
    }

    Ok(j)
}

/// Convergence criteria
#[derive(Debug, Clone, Copy)]
pub struct Convergence {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Tolerance on gradient norm: ||grad f|| < grad_tol
    pub grad_tol: f64,
    /// Tolerance on objective improvement: f_{k-1} - f_k < f_tol
    pub f_tol: f64,
}

impl Default for Convergence {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            grad_tol: 1e-9,
            f_tol: 1e-9,
        }
    }
}

impl Convergence {
    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        for (name, tol) in [("grad_tol", self.grad_tol), ("f_tol", self.f_tol)] {
            if !(tol >= 0.0) || !tol.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "{} must be finite and non-negative, got {}",
                    name, tol
                )));
            }
        }
        Ok(())
    }
}

/// Why the optimizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Gradient norm fell below `grad_tol`
    GradientTolerance,
    /// Objective improvement fell below `f_tol`
    FunctionTolerance,
    /// `max_iterations` reached
    MaxIterations,
    /// Damping grew past `lambda_max` without an acceptable step
    DampingLimit,
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            Termination::GradientTolerance | Termination::FunctionTolerance
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Termination::GradientTolerance => "gradient norm below tolerance",
            Termination::FunctionTolerance => "objective improvement below tolerance",
            Termination::MaxIterations => "maximum iterations reached",
            Termination::DampingLimit => "damping parameter too large",
        };
        f.write_str(msg)
    }
}

/// Optimization result
#[derive(Debug, Clone)]
pub struct OptimizationResult<P> {
    /// Final point
    pub point: P,
    /// Final objective value ||r||^2
    pub value: f64,
    /// Final gradient norm
    pub grad_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Convergence status
    pub converged: bool,
    /// Reason for termination
    pub termination: Termination,
}

impl<P> OptimizationResult<P> {
    fn finish(
        point: P,
        value: f64,
        grad_norm: f64,
        iterations: usize,
        termination: Termination,
    ) -> Self {
        debug!(
            iterations,
            value,
            grad_norm,
            converged = termination.is_converged(),
            "levenberg-marquardt stopped: {}",
            termination
        );
        Self {
            point,
            value,
            grad_norm,
            iterations,
            converged: termination.is_converged(),
            termination,
        }
    }
}

/// Riemannian Levenberg-Marquardt for least-squares objectives on a manifold
///
/// Each iteration solves the damped normal equations in tangent coordinates
/// at the current point and steps along the exponential map:
/// 1. Solve (J^T J + λ I) δ = -J^T r
/// 2. p_new = exp_p(δ)
/// 3. Accept if the gain ratio is positive and decrease λ, else increase λ
#[derive(Debug, Clone)]
pub struct RiemannianLevenbergMarquardt {
    /// Convergence criteria
    pub convergence: Convergence,
    /// Initial damping parameter (λ_0)
    pub lambda_init: f64,
    /// Factor to increase damping when step is rejected (ν)
    pub lambda_up: f64,
    /// Factor to decrease damping when step is accepted
    pub lambda_down: f64,
    /// Maximum lambda before declaring failure
    pub lambda_max: f64,
}

impl Default for RiemannianLevenbergMarquardt {
    fn default() -> Self {
        Self {
            convergence: Convergence::default(),
            lambda_init: 1e-3,
            lambda_up: 2.0,
            lambda_down: 0.5,
            lambda_max: 1e10,
        }
    }
}

impl RiemannianLevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set convergence criteria
    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.convergence = convergence;
        self
    }

    /// Set damping parameters
    pub fn with_lm_params(mut self, lambda_init: f64, lambda_up: f64, lambda_down: f64) -> Self {
        self.lambda_init = lambda_init;
        self.lambda_up = lambda_up;
        self.lambda_down = lambda_down;
        self
    }

    /// Minimize ||r(p)||^2 starting from `p0`
    pub fn minimize<M, R>(
        &self,
        manifold: &M,
        residual_fn: &R,
        p0: M::Point,
    ) -> Result<OptimizationResult<M::Point>>
    where
        M: EmbeddedManifold<Vector = Array1<f64>, Scalar = f64>,
        R: ResidualFunction<M>,
    {
        self.convergence.validate()?;
        manifold.validate_point(&p0)?;

        let mut p = p0;
        let mut lambda = self.lambda_init;
        let mut r = residual_fn.residual(manifold, &p)?;
        let mut f_val = r.dot(&r);
        let mut grad_norm = f64::INFINITY;

        for iter in 0..self.convergence.max_iterations {
            let j = residual_fn.jacobian(manifold, &p)?;

            // Gauss-Newton Hessian approximation and gradient of ||r||^2 / 2
            let jtj = j.t().dot(&j);
            let jtr = j.t().dot(&r);
            grad_norm = 2.0 * jtr.norm_l2();

            trace!(iteration = iter, value = f_val, grad_norm, lambda, "lm iteration");

            if grad_norm < self.convergence.grad_tol {
                return Ok(OptimizationResult::finish(
                    p,
                    f_val,
                    grad_norm,
                    iter,
                    Termination::GradientTolerance,
                ));
            }

            let mut h = jtj.clone();
            for i in 0..h.nrows() {
                h[[i, i]] += lambda;
            }

            let delta = match h.solve(&(-&jtr)) {
                Ok(d) => d,
                Err(_) => {
                    // Singular system, increase damping and try again
                    lambda *= self.lambda_up;
                    if lambda > self.lambda_max {
                        return Ok(OptimizationResult::finish(
                            p,
                            f_val,
                            grad_norm,
                            iter + 1,
                            Termination::DampingLimit,
                        ));
                    }
                    continue;
                }
            };

            let p_new = manifold.exp_unchecked(&p, &delta);
            let r_new = residual_fn.residual(manifold, &p_new)?;
            let f_new = r_new.dot(&r_new);

            // Gain ratio ρ = (f - f_new) / (L(0) - L(δ)), L(δ) = ||r + J δ||^2
            let actual_reduction = f_val - f_new;
            let predicted_reduction = -2.0 * jtr.dot(&delta) - delta.dot(&jtj.dot(&delta));

            let accepted = if predicted_reduction.abs() < 1e-15 {
                actual_reduction >= 0.0
            } else {
                actual_reduction / predicted_reduction > 0.0
            };

            if accepted {
                p = p_new;
                r = r_new;
                f_val = f_new;
                lambda = (lambda * self.lambda_down).max(1e-12);

                if actual_reduction < self.convergence.f_tol {
                    return Ok(OptimizationResult::finish(
                        p,
                        f_val,
                        grad_norm,
                        iter + 1,
                        Termination::FunctionTolerance,
                    ));
                }
            } else {
                // The local model promises less than the tolerance: no step
                // can improve f by more than f_tol from here
                if predicted_reduction.abs() < self.convergence.f_tol {
                    return Ok(OptimizationResult::finish(
                        p,
                        f_val,
                        grad_norm,
                        iter + 1,
                        Termination::FunctionTolerance,
                    ));
                }
                lambda *= self.lambda_up;
            }

            if lambda > self.lambda_max {
                return Ok(OptimizationResult::finish(
                    p,
                    f_val,
                    grad_norm,
                    iter + 1,
                    Termination::DampingLimit,
                ));
            }
        }

        Ok(OptimizationResult::finish(
            p,
            f_val,
            grad_norm,
            self.convergence.max_iterations,
            Termination::MaxIterations,
        ))
    }
}
