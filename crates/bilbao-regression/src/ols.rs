//! Ordinary Least Squares
//!
//! Solves the normal equations for `y = X * b + e`:
//!
//! ```text
//! b = (X^T X)^-1 X^T y
//! Var(b) = s^2 (X^T X)^-1,   s^2 = e^T e / (n - k)
//! ```
//!
//! The inverse is computed with Gauss-Jordan elimination and partial pivoting.
//! Design matrices here are tiny (two or four columns), so a dense inverse is
//! both cheap and accurate enough.
//!
//! When `X^T X` is singular (collinear regressors, or no more observations
//! than coefficients) the Moore-Penrose pseudo-inverse takes its place. The
//! coefficients are then the minimum-norm least-squares solution, residual
//! degrees of freedom are `n - rank`, and every statistic that needs positive
//! residual degrees of freedom is NaN.
//!
//! Reported statistics follow the usual conventions for a model with an
//! intercept: R² uses the centred total sum of squares, and the F-statistic
//! tests all slope coefficients jointly against zero.

use crate::error::{RegressionError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

/// Relative pivot size below which `X^T X` is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Relative eigenvalue size below which a direction counts as null space.
const RANK_TOLERANCE: f64 = 1e-10;

const JACOBI_MAX_SWEEPS: usize = 100;

/// Coefficients and fit statistics of one OLS regression.
///
/// Vectors are indexed by regressor, in design-matrix column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Estimated coefficients.
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// t-statistics (`coefficient / std_error`).
    pub t_stats: Vec<f64>,
    /// Two-sided p-values of the t-statistics.
    pub p_values: Vec<f64>,
    /// Coefficient of determination; NaN when the response is constant.
    pub r_squared: f64,
    /// R² adjusted for the number of regressors.
    pub adj_r_squared: f64,
    /// Residual standard error `s`.
    pub residual_std_error: f64,
    /// F-statistic for the joint significance of the slope coefficients.
    pub f_statistic: f64,
    /// p-value of the F-statistic.
    pub f_p_value: f64,
    /// Number of observations.
    pub n_obs: usize,
    /// Numerical rank of the design matrix.
    pub rank: usize,
}

impl OlsFit {
    /// Number of estimated coefficients, including the intercept.
    pub fn n_params(&self) -> usize {
        self.coefficients.len()
    }

    /// Residual degrees of freedom, `n - rank`.
    pub fn df_resid(&self) -> usize {
        self.n_obs.saturating_sub(self.rank)
    }

    /// Whether the design matrix had full column rank.
    pub fn is_full_rank(&self) -> bool {
        self.rank == self.n_params()
    }
}

/// Build a design matrix with a leading constant column.
///
/// # Arguments
/// * `regressors` - One slice per regressor, all of the response's length
/// * `n_obs` - Expected number of observations
pub fn design_matrix(regressors: &[&[f64]], n_obs: usize) -> Result<Array2<f64>> {
    let mut x = Array2::<f64>::ones((n_obs, regressors.len() + 1));
    for (j, values) in regressors.iter().enumerate() {
        if values.len() != n_obs {
            return Err(RegressionError::DimensionMismatch {
                expected: n_obs,
                actual: values.len(),
            });
        }
        for (i, value) in values.iter().enumerate() {
            x[[i, j + 1]] = *value;
        }
    }
    Ok(x)
}

/// Fit `y` on the columns of `x` by least squares.
///
/// `x` must already contain the constant column if an intercept is wanted.
/// Fails when there are no observations or when any input is non-finite. A
/// singular `X^T X` falls back to the pseudo-inverse (see the module docs).
pub fn fit(y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsFit> {
    let (n, k) = x.dim();
    if y.len() != n {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: y.len(),
        });
    }
    if n == 0 {
        return Err(RegressionError::InsufficientObservations {
            required: 1,
            actual: 0,
        });
    }
    if !y.iter().chain(x.iter()).all(|v| v.is_finite()) {
        return Err(RegressionError::NonFinite);
    }

    let xtx = x.t().dot(x);
    let (xtx_inv, rank) = match invert(&xtx) {
        Ok(inv) => (inv, k),
        Err(RegressionError::Singular) => {
            let (pinv, rank) = pseudo_inverse(&xtx)?;
            debug!(n_obs = n, params = k, rank, "rank-deficient design; using pseudo-inverse");
            (pinv, rank)
        }
        Err(e) => return Err(e),
    };
    let beta = xtx_inv.dot(&x.t().dot(y));

    let fitted = x.dot(&beta);
    let residuals = y - &fitted;
    let ssr = residuals.dot(&residuals);
    let mean_y = y.mean().unwrap_or(f64::NAN);
    let sst = y.iter().map(|v| (v - mean_y).powi(2)).sum::<f64>();

    let df_resid = n.saturating_sub(rank);
    let sigma2 = if df_resid > 0 {
        ssr / df_resid as f64
    } else {
        f64::NAN
    };

    // `f64::max` would turn a NaN variance into zero.
    let std_errors: Vec<f64> = (0..k)
        .map(|j| match sigma2 * xtx_inv[[j, j]] {
            var if var.is_nan() => f64::NAN,
            var => var.max(0.0).sqrt(),
        })
        .collect();
    let t_stats: Vec<f64> = beta
        .iter()
        .zip(&std_errors)
        .map(|(b, se)| b / se)
        .collect();

    let p_values = if df_resid > 0 {
        let students_t = StudentsT::new(0.0, 1.0, df_resid as f64)
            .map_err(|e| RegressionError::Distribution(e.to_string()))?;
        t_stats
            .iter()
            .map(|t| two_sided_p_value(&students_t, *t))
            .collect()
    } else {
        vec![f64::NAN; k]
    };

    let (r_squared, adj_r_squared) = if sst > 0.0 {
        let r2 = 1.0 - ssr / sst;
        let adj = if df_resid > 0 {
            1.0 - (1.0 - r2) * (n as f64 - 1.0) / df_resid as f64
        } else {
            f64::NAN
        };
        (r2, adj)
    } else {
        (f64::NAN, f64::NAN)
    };

    let (f_statistic, f_p_value) = f_test(sst, ssr, rank, n)?;

    Ok(OlsFit {
        coefficients: beta.to_vec(),
        std_errors,
        t_stats,
        p_values,
        r_squared,
        adj_r_squared,
        residual_std_error: sigma2.sqrt(),
        f_statistic,
        f_p_value,
        n_obs: n,
        rank,
    })
}

/// Fit `y` on a constant plus the given regressors.
pub fn fit_with_intercept(y: &[f64], regressors: &[&[f64]]) -> Result<OlsFit> {
    let x = design_matrix(regressors, y.len())?;
    fit(&Array1::from(y.to_vec()), &x)
}

fn two_sided_p_value(dist: &StudentsT, t: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    2.0 * (1.0 - dist.cdf(t.abs()))
}

/// Joint F test of the slopes; `rank` counts the intercept.
fn f_test(sst: f64, ssr: f64, rank: usize, n: usize) -> Result<(f64, f64)> {
    if rank < 2 || n <= rank || sst <= 0.0 {
        return Ok((f64::NAN, f64::NAN));
    }
    let df_model = (rank - 1) as f64;
    let df_resid = (n - rank) as f64;
    let f = ((sst - ssr) / df_model) / (ssr / df_resid);
    if f.is_nan() {
        return Ok((f, f64::NAN));
    }
    let dist = FisherSnedecor::new(df_model, df_resid)
        .map_err(|e| RegressionError::Distribution(e.to_string()))?;
    Ok((f, 1.0 - dist.cdf(f)))
}

/// Invert a square matrix with Gauss-Jordan elimination and partial pivoting.
pub fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return Err(RegressionError::Singular);
    }

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        let pivot = a[[pivot_row, col]];
        if pivot.abs() <= PIVOT_TOLERANCE * scale {
            return Err(RegressionError::Singular);
        }

        if pivot_row != col {
            for j in 0..n {
                a.swap([pivot_row, j], [col, j]);
                inv.swap([pivot_row, j], [col, j]);
            }
        }

        for j in 0..n {
            a[[col, j]] /= pivot;
            inv[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[[row, j]] -= factor * a[[col, j]];
                inv[[row, j]] -= factor * inv[[col, j]];
            }
        }
    }

    Ok(inv)
}

/// Moore-Penrose pseudo-inverse of a symmetric positive semi-definite matrix,
/// together with its numerical rank.
///
/// Eigenvalues at or below `RANK_TOLERANCE` times the largest one are treated
/// as zero.
pub fn pseudo_inverse(matrix: &Array2<f64>) -> Result<(Array2<f64>, usize)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let (eigenvalues, eigenvectors) = symmetric_eigen(matrix);
    let largest = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(*v));
    let cutoff = RANK_TOLERANCE * largest;

    let mut pinv = Array2::<f64>::zeros((n, n));
    let mut rank = 0;
    for (idx, &lambda) in eigenvalues.iter().enumerate() {
        if largest <= 0.0 || lambda <= cutoff {
            continue;
        }
        rank += 1;
        let v = eigenvectors.column(idx);
        for i in 0..n {
            for j in 0..n {
                pinv[[i, j]] += v[i] * v[j] / lambda;
            }
        }
    }

    Ok((pinv, rank))
}

/// Eigenvalues and eigenvectors (as columns) of a symmetric matrix by cyclic
/// Jacobi rotations.
fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = matrix.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off_diagonal = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .fold(0.0_f64, |acc, (i, j)| acc.max(a[[i, j]].abs()));
        if off_diagonal <= f64::EPSILON * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let tau = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = tau.signum() / (tau.abs() + (1.0 + tau * tau).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_owned(), v)
}
