//! Factor Models
//!
//! Time-series regressions of a stock's excess return on factor returns:
//!
//! ```text
//! CAPM:  R_i - R_f = a + b (R_m - R_f) + e
//! FF3:   R_i - R_f = a + b (R_m - R_f) + s SMB + h HML + e
//! ```
//!
//! Both models always include the constant. The market term is the index
//! return in excess of the risk-free rate, not the `Mkt-RF` column of the
//! factor file.

use crate::error::{RegressionError, Result};
use crate::ols::{self, OlsFit};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which factor model produced a result.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Single-factor capital asset pricing model
    #[display("CAPM")]
    Capm,
    /// Fama-French three-factor model
    #[display("FF3")]
    ThreeFactor,
}

/// Regressors shared by every stock, aligned with the stock excess returns.
#[derive(Debug, Clone, Copy)]
pub struct FactorInputs<'a> {
    /// Index return minus the risk-free rate.
    pub market: &'a [f64],
    /// Size factor.
    pub smb: &'a [f64],
    /// Value factor.
    pub hml: &'a [f64],
}

impl<'a> FactorInputs<'a> {
    /// Bundle the factor series.
    pub const fn new(market: &'a [f64], smb: &'a [f64], hml: &'a [f64]) -> Self {
        Self { market, smb, hml }
    }
}

/// A regression model fitted independently for each stock.
pub trait FactorModel {
    /// Per-stock result record.
    type Output: Serialize;

    /// Model identifier.
    fn kind(&self) -> ModelKind;

    /// Names of the design-matrix columns, constant first.
    fn regressor_names(&self) -> &'static [&'static str];

    /// Fit one stock.
    ///
    /// # Arguments
    /// * `symbol` - Stock symbol recorded in the output
    /// * `excess` - Stock return minus the risk-free rate
    /// * `factors` - Regressors aligned with `excess`
    fn fit(&self, symbol: &str, excess: &[f64], factors: &FactorInputs<'_>) -> Result<Self::Output>;

    /// Fit every stock in order, failing on the first error.
    fn fit_all<'s, I>(&self, stocks: I, factors: &FactorInputs<'_>) -> Result<Vec<Self::Output>>
    where
        I: IntoIterator<Item = (&'s str, &'s [f64])>,
    {
        stocks
            .into_iter()
            .map(|(symbol, excess)| {
                self.fit(symbol, excess, factors)
                    .map_err(|e| RegressionError::Stock {
                        model: self.kind().to_string(),
                        symbol: symbol.to_string(),
                        source: Box::new(e),
                    })
            })
            .collect()
    }
}

/// CAPM estimate for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmResult {
    /// Stock symbol.
    pub stock: String,
    /// Intercept.
    pub alpha: f64,
    /// Market beta.
    pub beta: f64,
    /// t-statistic of the intercept.
    pub alpha_t: f64,
    /// t-statistic of the market beta.
    pub beta_t: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Full fit statistics.
    pub fit: OlsFit,
}

/// Three-factor estimate for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeFactorResult {
    /// Stock symbol.
    pub stock: String,
    /// Intercept.
    pub alpha: f64,
    /// Market beta.
    pub beta: f64,
    /// Size loading.
    pub smb: f64,
    /// Value loading.
    pub hml: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Full fit statistics.
    pub fit: OlsFit,
}

/// Single-factor market model.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapmModel;

impl FactorModel for CapmModel {
    type Output = CapmResult;

    fn kind(&self) -> ModelKind {
        ModelKind::Capm
    }

    fn regressor_names(&self) -> &'static [&'static str] {
        &["const", "Market"]
    }

    fn fit(&self, symbol: &str, excess: &[f64], factors: &FactorInputs<'_>) -> Result<CapmResult> {
        let fit = ols::fit_with_intercept(excess, &[factors.market])?;
        debug!(symbol, n = fit.n_obs, r2 = fit.r_squared, "fitted CAPM");

        Ok(CapmResult {
            stock: symbol.to_string(),
            alpha: fit.coefficients[0],
            beta: fit.coefficients[1],
            alpha_t: fit.t_stats[0],
            beta_t: fit.t_stats[1],
            r_squared: fit.r_squared,
            fit,
        })
    }
}

/// Fama-French three-factor model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeFactorModel;

impl FactorModel for ThreeFactorModel {
    type Output = ThreeFactorResult;

    fn kind(&self) -> ModelKind {
        ModelKind::ThreeFactor
    }

    fn regressor_names(&self) -> &'static [&'static str] {
        &["const", "Market", "SMB", "HML"]
    }

    fn fit(
        &self,
        symbol: &str,
        excess: &[f64],
        factors: &FactorInputs<'_>,
    ) -> Result<ThreeFactorResult> {
        let fit = ols::fit_with_intercept(excess, &[factors.market, factors.smb, factors.hml])?;
        debug!(symbol, n = fit.n_obs, r2 = fit.r_squared, "fitted three-factor model");

        Ok(ThreeFactorResult {
            stock: symbol.to_string(),
            alpha: fit.coefficients[0],
            beta: fit.coefficients[1],
            smb: fit.coefficients[2],
            hml: fit.coefficients[3],
            r_squared: fit.r_squared,
            fit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic_factors(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = (0..n).map(|_| rng.gen_range(-0.08..0.08)).collect();
        let smb = (0..n).map(|_| rng.gen_range(-0.03..0.03)).collect();
        let hml = (0..n).map(|_| rng.gen_range(-0.03..0.03)).collect();
        (market, smb, hml)
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Capm.to_string(), "CAPM");
        assert_eq!(ModelKind::ThreeFactor.to_string(), "FF3");
    }

    #[test]
    fn test_capm_beta_two_without_noise() {
        let (market, smb, hml) = synthetic_factors(48, 1);
        let excess: Vec<f64> = market.iter().map(|m| 2.0 * m).collect();
        let inputs = FactorInputs::new(&market, &smb, &hml);

        let result = CapmModel.fit("BKT.MC", &excess, &inputs).unwrap();
        assert_eq!(result.stock, "BKT.MC");
        assert_abs_diff_eq!(result.beta, 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result.alpha, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result.r_squared, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_three_factor_recovers_loadings() {
        let (market, smb, hml) = synthetic_factors(240, 2);
        let mut rng = StdRng::seed_from_u64(3);
        let excess: Vec<f64> = (0..market.len())
            .map(|i| {
                0.001 + 0.9 * market[i] + 0.4 * smb[i] - 0.3 * hml[i]
                    + rng.gen_range(-0.005..0.005)
            })
            .collect();
        let inputs = FactorInputs::new(&market, &smb, &hml);

        let result = ThreeFactorModel.fit("ENG.MC", &excess, &inputs).unwrap();
        assert_abs_diff_eq!(result.beta, 0.9, epsilon = 0.02);
        assert_abs_diff_eq!(result.smb, 0.4, epsilon = 0.05);
        assert_abs_diff_eq!(result.hml, -0.3, epsilon = 0.05);
        assert!(result.r_squared > 0.95);
        assert_eq!(result.fit.n_params(), 4);
        assert_eq!(
            ThreeFactorModel.regressor_names().len(),
            result.fit.coefficients.len()
        );
    }

    #[test]
    fn test_fit_all_preserves_order() {
        let (market, smb, hml) = synthetic_factors(36, 4);
        let inputs = FactorInputs::new(&market, &smb, &hml);
        let a: Vec<f64> = market.iter().map(|m| 0.5 * m + 0.001).collect();
        let b: Vec<f64> = market.iter().map(|m| 1.5 * m - 0.002).collect();

        let results = CapmModel
            .fit_all([("COL.MC", a.as_slice()), ("ANA.MC", b.as_slice())], &inputs)
            .unwrap();
        let stocks: Vec<&str> = results.iter().map(|r| r.stock.as_str()).collect();
        assert_eq!(stocks, vec!["COL.MC", "ANA.MC"]);
        assert_abs_diff_eq!(results[1].beta, 1.5, epsilon = 1e-10);
    }

    #[test]
    fn test_fit_all_wraps_error_with_symbol() {
        let market = vec![0.01, 0.02, 0.03];
        let inputs = FactorInputs::new(&market, &market, &market);
        let excess = vec![0.03, f64::NAN, 0.04];

        let err = ThreeFactorModel
            .fit_all([("LOG.MC", excess.as_slice())], &inputs)
            .unwrap_err();
        match err {
            RegressionError::Stock {
                model,
                symbol,
                source,
            } => {
                assert_eq!(model, "FF3");
                assert_eq!(symbol, "LOG.MC");
                assert!(matches!(*source, RegressionError::NonFinite));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_sample_still_produces_estimates() {
        // Two months cannot identify four coefficients; the fit degrades to NaN
        // statistics instead of failing the whole run.
        let market = vec![0.01, 0.02];
        let smb = vec![0.004, -0.002];
        let hml = vec![-0.001, 0.003];
        let inputs = FactorInputs::new(&market, &smb, &hml);
        let excess = vec![0.03, 0.04];

        let capm = CapmModel
            .fit_all([("BKT.MC", excess.as_slice())], &inputs)
            .unwrap();
        assert_abs_diff_eq!(capm[0].beta, 1.0, epsilon = 1e-8);
        assert!(capm[0].beta_t.is_nan());

        let ff3 = ThreeFactorModel
            .fit_all([("BKT.MC", excess.as_slice())], &inputs)
            .unwrap();
        assert_eq!(ff3[0].fit.rank, 2);
        assert!(ff3[0].alpha.is_finite() && ff3[0].hml.is_finite());
        assert!(ff3[0].fit.t_stats.iter().all(|t| t.is_nan()));
    }
}
