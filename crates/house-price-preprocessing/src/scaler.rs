use house_price_core::{Matrix, MlError, MlResult};
use serde::{Deserialize, Serialize};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Uses the population standard deviation. A constant column keeps a
/// scale of 1 so it maps to zeros instead of NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler
    }

    /// Compute per-column mean and scale from training data (`[samples, features]`).
    pub fn fit(self, x: &Matrix) -> MlResult<FittedStandardScaler> {
        let (n, p) = x.shape();
        if n == 0 {
            return Err(MlError::EmptyData("StandardScaler::fit: no rows".into()));
        }
        if !x.all_finite() {
            return Err(MlError::NonFinite("StandardScaler::fit: input contains NaN or infinity".into()));
        }

        let mut mean = vec![0.0; p];
        for row in x.iter_rows() {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);

        let mut var = vec![0.0; p];
        for row in x.iter_rows() {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n as f64).sqrt();
                if std < f64::EPSILON { 1.0 } else { std }
            })
            .collect();

        Ok(FittedStandardScaler { mean, scale })
    }

    /// Fit and transform in one step.
    pub fn fit_transform(self, x: &Matrix) -> MlResult<(FittedStandardScaler, Matrix)> {
        let fitted = self.fit(x)?;
        let out = fitted.transform(x)?;
        Ok((fitted, out))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedStandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FittedStandardScaler {
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check a deserialized scaler: one finite mean and one finite,
    /// non-zero scale per feature.
    pub fn validate(&self) -> MlResult<()> {
        if self.mean.len() != self.scale.len() {
            return Err(MlError::DimensionMismatch(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        let usable = self.mean.iter().all(|m| m.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s != 0.0);
        if !usable {
            return Err(MlError::NonFinite("scaler statistics".into()));
        }
        Ok(())
    }

    /// `(x - mean) / scale`, column by column.
    pub fn transform(&self, x: &Matrix) -> MlResult<Matrix> {
        if x.cols() != self.n_features() {
            return Err(MlError::ShapeMismatch {
                expected: vec![x.rows(), self.n_features()],
                got: vec![x.rows(), x.cols()],
            });
        }
        let mut data = Vec::with_capacity(x.rows() * x.cols());
        for row in x.iter_rows() {
            for ((&v, &m), &s) in row.iter().zip(&self.mean).zip(&self.scale) {
                data.push((v - m) / s);
            }
        }
        Matrix::new(data, x.rows(), x.cols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standard_scaler() {
        let x = Matrix::from_vec2d(&[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]]).unwrap();
        let (fitted, scaled) = StandardScaler::new().fit_transform(&x).unwrap();

        assert_abs_diff_eq!(fitted.mean()[0], 2.0);
        assert_abs_diff_eq!(fitted.scale()[0], (2.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        for j in 0..2 {
            let col = scaled.column(j).unwrap();
            let mean: f64 = col.iter().sum::<f64>() / 3.0;
            let var: f64 = col.iter().map(|v| v * v).sum::<f64>() / 3.0;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(var, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = Matrix::from_vec2d(&[vec![5.0], vec![5.0]]).unwrap();
        let (fitted, scaled) = StandardScaler::new().fit_transform(&x).unwrap();
        assert_eq!(fitted.scale(), &[1.0]);
        assert_eq!(scaled.data(), &[0.0, 0.0]);
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = Matrix::from_vec2d(&[vec![0.0], vec![2.0]]).unwrap();
        let fitted = StandardScaler::new().fit(&train).unwrap();
        let out = fitted.transform(&Matrix::from_vec2d(&[vec![3.0]]).unwrap()).unwrap();
        assert_abs_diff_eq!(out.data()[0], 2.0);
        assert!(fitted.transform(&Matrix::zeros(1, 2)).is_err());
    }

    #[test]
    fn test_zero_width_input() {
        let fitted = StandardScaler::new().fit(&Matrix::zeros(4, 0)).unwrap();
        assert_eq!(fitted.n_features(), 0);
        assert_eq!(fitted.transform(&Matrix::zeros(2, 0)).unwrap().shape(), (2, 0));
    }
}
