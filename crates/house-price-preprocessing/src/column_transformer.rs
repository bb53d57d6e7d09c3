use crate::encoder::{FittedOneHotEncoder, OneHotEncoder};
use crate::imputer::{FittedNumericImputer, FittedTextImputer, ImputeStrategy, SimpleImputer};
use crate::scaler::{FittedStandardScaler, StandardScaler};
use house_price_core::{ColumnKind, Matrix, MlError, MlResult, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Build the two-branch preprocessing pipeline for the given column roles.
///
/// - numerical: median imputation, then standard scaling
/// - categorical: most-frequent imputation, then one-hot encoding
pub fn build_pipeline(numerical_cols: &[String], categorical_cols: &[String]) -> ColumnTransformer {
    ColumnTransformer::new(numerical_cols.to_vec(), categorical_cols.to_vec())
}

/// Unfitted column transformer. Fitting consumes it and yields a
/// [`FittedColumnTransformer`], the only type that can transform.
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    numerical: Vec<String>,
    categorical: Vec<String>,
}

impl ColumnTransformer {
    pub fn new(numerical: Vec<String>, categorical: Vec<String>) -> Self {
        ColumnTransformer {
            numerical,
            categorical,
        }
    }

    pub fn fit(self, x: &Table) -> MlResult<FittedColumnTransformer> {
        if x.n_rows() == 0 {
            return Err(MlError::EmptyData("ColumnTransformer::fit: no rows".into()));
        }
        if let Some(dup) = self.numerical.iter().find(|c| self.categorical.contains(c)) {
            return Err(MlError::InvalidParameter(format!(
                "column `{}` is listed as both numerical and categorical",
                dup
            )));
        }

        let median = SimpleImputer::new(ImputeStrategy::Median);
        let mut numeric_imputers = Vec::with_capacity(self.numerical.len());
        let mut imputed = Vec::with_capacity(self.numerical.len());
        for name in &self.numerical {
            let values = numeric_column(x, name)?;
            let imputer = median.fit_numeric(name, values)?;
            debug!(column = %name, fill = imputer.fill(), "numeric imputer fitted");
            imputed.push(imputer.transform(values));
            numeric_imputers.push(imputer);
        }
        let scaler = StandardScaler::new().fit(&Matrix::from_columns(&imputed, x.n_rows())?)?;

        let most_frequent = SimpleImputer::new(ImputeStrategy::MostFrequent);
        let mut text_imputers = Vec::with_capacity(self.categorical.len());
        let mut filled = Vec::with_capacity(self.categorical.len());
        for name in &self.categorical {
            let values = text_column(x, name)?;
            let imputer = most_frequent.fit_text(name, values)?;
            debug!(column = %name, fill = imputer.fill(), "categorical imputer fitted");
            filled.push(imputer.transform(values));
            text_imputers.push(imputer);
        }
        let encoder = OneHotEncoder::new().fit(&filled)?;

        Ok(FittedColumnTransformer {
            numerical: self.numerical,
            categorical: self.categorical,
            numeric_imputers,
            scaler,
            text_imputers,
            encoder,
        })
    }

    /// Fit on `x` and return the fitted transformer with `x` transformed.
    pub fn fit_transform(self, x: &Table) -> MlResult<(FittedColumnTransformer, Matrix)> {
        let fitted = self.fit(x)?;
        let out = fitted.transform(x)?;
        Ok((fitted, out))
    }
}

/// Frozen preprocessing state learned from the training split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    numerical: Vec<String>,
    categorical: Vec<String>,
    numeric_imputers: Vec<FittedNumericImputer>,
    scaler: FittedStandardScaler,
    text_imputers: Vec<FittedTextImputer>,
    encoder: FittedOneHotEncoder,
}

impl FittedColumnTransformer {
    pub fn numerical_columns(&self) -> &[String] {
        &self.numerical
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical
    }

    /// Training vocabulary of a categorical column, sorted.
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        let i = self.categorical.iter().position(|c| c == column)?;
        self.encoder.categories().get(i).map(Vec::as_slice)
    }

    /// Every input column the transformer reads, numerical first.
    pub fn input_columns(&self) -> impl Iterator<Item = (&str, ColumnKind)> + '_ {
        self.numerical
            .iter()
            .map(|c| (c.as_str(), ColumnKind::Numeric))
            .chain(self.categorical.iter().map(|c| (c.as_str(), ColumnKind::Text)))
    }

    /// Check a deserialized transformer: every column has exactly one
    /// fitted step per branch and each step is usable.
    pub fn validate(&self) -> MlResult<()> {
        let numeric_steps = [
            self.numeric_imputers.len(),
            self.scaler.n_features(),
        ];
        if numeric_steps.iter().any(|&n| n != self.numerical.len()) {
            return Err(MlError::DimensionMismatch(format!(
                "{} numerical columns but {} imputers and {} scaled features",
                self.numerical.len(),
                self.numeric_imputers.len(),
                self.scaler.n_features()
            )));
        }
        let categorical_steps = [self.text_imputers.len(), self.encoder.categories().len()];
        if categorical_steps.iter().any(|&n| n != self.categorical.len()) {
            return Err(MlError::DimensionMismatch(format!(
                "{} categorical columns but {} imputers and {} vocabularies",
                self.categorical.len(),
                self.text_imputers.len(),
                self.encoder.categories().len()
            )));
        }
        if self.numeric_imputers.iter().any(|i| !i.fill().is_finite()) {
            return Err(MlError::NonFinite("numeric imputer fill value".into()));
        }
        self.scaler.validate()?;
        self.encoder.validate()
    }

    /// Width of every transformed matrix.
    pub fn n_features_out(&self) -> usize {
        self.numerical.len() + self.encoder.n_features_out()
    }

    /// Output column names: `num__<col>` then `cat__<col>_<category>`.
    pub fn feature_names(&self) -> Vec<String> {
        self.numerical
            .iter()
            .map(|c| format!("num__{}", c))
            .chain(
                self.encoder
                    .feature_names(&self.categorical)
                    .into_iter()
                    .map(|c| format!("cat__{}", c)),
            )
            .collect()
    }

    /// Apply the learned statistics to `x`. Extra columns are ignored.
    pub fn transform(&self, x: &Table) -> MlResult<Matrix> {
        let rows = x.n_rows();

        let mut imputed = Vec::with_capacity(self.numerical.len());
        for (name, imputer) in self.numerical.iter().zip(&self.numeric_imputers) {
            let values = numeric_column(x, name)?;
            if values.iter().flatten().any(|v| !v.is_finite()) {
                return Err(MlError::NonFinite(format!("column `{}`", name)));
            }
            imputed.push(imputer.transform(values));
        }
        let numeric = self.scaler.transform(&Matrix::from_columns(&imputed, rows)?)?;

        let mut filled = Vec::with_capacity(self.categorical.len());
        for (name, imputer) in self.categorical.iter().zip(&self.text_imputers) {
            filled.push(imputer.transform(text_column(x, name)?));
        }
        let categorical = self.encoder.transform(&filled, rows)?;

        Matrix::hconcat(&[&numeric, &categorical])
    }
}

fn numeric_column<'a>(x: &'a Table, name: &str) -> MlResult<&'a [Option<f64>]> {
    x.require(name)?.as_numeric().ok_or_else(|| MlError::ColumnKind {
        column: name.to_string(),
        expected: ColumnKind::Numeric,
    })
}

fn text_column<'a>(x: &'a Table, name: &str) -> MlResult<&'a [Option<String>]> {
    x.require(name)?.as_text().ok_or_else(|| MlError::ColumnKind {
        column: name.to_string(),
        expected: ColumnKind::Text,
    })
}
