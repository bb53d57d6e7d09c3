use house_price_core::{Matrix, MlError, MlResult};
use serde::{Deserialize, Serialize};

/// One-hot encode text columns.
///
/// Each column's vocabulary is the sorted set of values seen at fit time.
/// Values never seen during fit encode as an all-zero block instead of
/// failing, so serving tolerates new categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneHotEncoder;

impl OneHotEncoder {
    pub fn new() -> Self {
        OneHotEncoder
    }

    /// Learn one sorted vocabulary per column. `columns[j]` holds column `j`.
    pub fn fit(self, columns: &[Vec<String>]) -> MlResult<FittedOneHotEncoder> {
        let categories = columns
            .iter()
            .map(|col| {
                let mut unique = col.clone();
                unique.sort();
                unique.dedup();
                unique
            })
            .collect();
        Ok(FittedOneHotEncoder { categories })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl FittedOneHotEncoder {
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Vocabularies must be strictly sorted, as `transform` searches them.
    pub fn validate(&self) -> MlResult<()> {
        for cats in &self.categories {
            if cats.windows(2).any(|w| w[0] >= w[1]) {
                return Err(MlError::InvalidParameter(
                    "one-hot vocabulary is not sorted and unique".into(),
                ));
            }
        }
        Ok(())
    }

    /// Total width of the encoded output.
    pub fn n_features_out(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// `<input>_<category>` for every output column, in output order.
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{}_{}", name, c)))
            .collect()
    }

    /// Encode `rows` samples; `columns[j]` holds column `j`.
    pub fn transform(&self, columns: &[Vec<String>], rows: usize) -> MlResult<Matrix> {
        if columns.len() != self.categories.len() {
            return Err(MlError::DimensionMismatch(format!(
                "OneHotEncoder fitted on {} columns, got {}",
                self.categories.len(),
                columns.len()
            )));
        }
        let width = self.n_features_out();
        let mut out = vec![0.0; rows * width];
        let mut offset = 0;
        for (col, cats) in columns.iter().zip(&self.categories) {
            if col.len() != rows {
                return Err(MlError::DimensionMismatch(format!(
                    "encoder column has {} values, expected {}",
                    col.len(),
                    rows
                )));
            }
            for (i, value) in col.iter().enumerate() {
                // Unknown values leave the block at zero.
                if let Ok(k) = cats.binary_search(value) {
                    out[i * width + offset + k] = 1.0;
                }
            }
            offset += cats.len();
        }
        Matrix::new(out, rows, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_hot_sorted_vocabulary() {
        let enc = OneHotEncoder::new()
            .fit(&[col(&["b", "a", "b"]), col(&["x", "y", "x"])])
            .unwrap();
        assert_eq!(enc.categories()[0], col(&["a", "b"]));
        assert_eq!(enc.n_features_out(), 4);

        let out = enc
            .transform(&[col(&["a", "b"]), col(&["y", "x"])], 2)
            .unwrap();
        assert_eq!(out.row(0).unwrap(), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(out.row(1).unwrap(), &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_encodes_as_zero_block() {
        let enc = OneHotEncoder::new().fit(&[col(&["A", "B"])]).unwrap();
        let out = enc.transform(&[col(&["C"])], 1).unwrap();
        assert_eq!(out.shape(), (1, 2));
        assert_eq!(out.row(0).unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_feature_names() {
        let enc = OneHotEncoder::new().fit(&[col(&["Pave", "Grvl"])]).unwrap();
        assert_eq!(
            enc.feature_names(&["Street".to_string()]),
            col(&["Street_Grvl", "Street_Pave"])
        );
    }

    #[test]
    fn test_validate_requires_sorted_vocabulary() {
        let enc = OneHotEncoder::new().fit(&[col(&["b", "a"])]).unwrap();
        enc.validate().unwrap();
        let unsorted = FittedOneHotEncoder {
            categories: vec![col(&["b", "a"])],
        };
        assert!(unsorted.validate().is_err());
    }

    #[test]
    fn test_column_count_mismatch() {
        let enc = OneHotEncoder::new().fit(&[col(&["a"])]).unwrap();
        assert!(enc.transform(&[], 0).is_err());
    }
}
