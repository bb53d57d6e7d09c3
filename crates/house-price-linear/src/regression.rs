use house_price_core::{Matrix, MlError, MlResult};
use house_price_linalg::lstsq;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordinary Least Squares linear regression.
///
/// Fits `y = Xw + b` by centering `X` and `y` and solving the centered
/// least-squares problem with pivoted QR. Collinear features (one-hot
/// blocks next to the intercept) get the minimum-norm weights instead of
/// failing, and the intercept is recovered as `ȳ - x̄·w`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub weights: Option<Vec<f64>>,
    pub bias: Option<f64>,
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        LinearRegression::new(true)
    }
}

impl LinearRegression {
    pub fn new(fit_intercept: bool) -> Self {
        LinearRegression {
            weights: None,
            bias: None,
            fit_intercept,
        }
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        let (n, p) = x.shape();
        if n != y.len() {
            return Err(MlError::DimensionMismatch(format!(
                "X has {} rows but y has {} values",
                n,
                y.len()
            )));
        }
        if n == 0 {
            return Err(MlError::EmptyData("LinearRegression::fit: no rows".into()));
        }

        let (x_mean, y_mean) = if self.fit_intercept {
            let mut x_mean = vec![0.0; p];
            for row in x.iter_rows() {
                for (m, &v) in x_mean.iter_mut().zip(row) {
                    *m += v;
                }
            }
            x_mean.iter_mut().for_each(|m| *m /= n as f64);
            (x_mean, y.iter().sum::<f64>() / n as f64)
        } else {
            (vec![0.0; p], 0.0)
        };

        let mut centered = Vec::with_capacity(n * p);
        for row in x.iter_rows() {
            centered.extend(row.iter().zip(&x_mean).map(|(v, m)| v - m));
        }
        let xc = Matrix::new(centered, n, p)?;
        let yc: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let solution = lstsq(&xc, &yc)?;
        debug!(features = p, rank = solution.rank, "least squares solved");

        let bias = y_mean - x_mean.iter().zip(&solution.x).map(|(m, w)| m * w).sum::<f64>();
        self.weights = Some(solution.x);
        self.bias = if self.fit_intercept { Some(bias) } else { None };
        Ok(())
    }

    /// Coefficients of a deserialized model must be finite.
    pub fn validate(&self) -> MlResult<()> {
        let finite = self.weights.iter().flatten().chain(&self.bias).all(|v| v.is_finite());
        if !finite {
            return Err(MlError::NonFinite("LinearRegression coefficients".into()));
        }
        if self.fit_intercept && self.weights.is_some() != self.bias.is_some() {
            return Err(MlError::InvalidParameter(
                "LinearRegression has weights without an intercept".into(),
            ));
        }
        Ok(())
    }

    pub fn n_features(&self) -> Option<usize> {
        self.weights.as_ref().map(Vec::len)
    }

    pub fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        let w = self
            .weights
            .as_ref()
            .ok_or_else(|| MlError::NotFitted("LinearRegression".into()))?;
        let mut pred = x.matvec(w)?;
        if let Some(b) = self.bias {
            pred.iter_mut().for_each(|v| *v += b);
        }
        Ok(pred)
    }
}
