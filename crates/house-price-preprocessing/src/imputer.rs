use house_price_core::{MlError, MlResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Fill value used for a text column that had no observed value at fit time.
pub const MISSING_TEXT_FILL: &str = "missing";

/// How missing values are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Median of the observed values (numeric columns only).
    Median,
    /// Most frequent observed value; ties go to the smallest value.
    MostFrequent,
}

/// Per-column imputer. Fitting produces a frozen fill value.
#[derive(Debug, Clone, Copy)]
pub struct SimpleImputer {
    pub strategy: ImputeStrategy,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        SimpleImputer { strategy }
    }

    /// Learn the fill value for a numeric column.
    ///
    /// A column with no observed value imputes 0.0 so the output keeps one
    /// column per input column.
    pub fn fit_numeric(&self, name: &str, values: &[Option<f64>]) -> MlResult<FittedNumericImputer> {
        let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
        if observed.iter().any(|v| !v.is_finite()) {
            return Err(MlError::NonFinite(format!("column `{}`", name)));
        }
        if observed.is_empty() {
            warn!(column = name, "no observed values at fit time, imputing 0.0");
            return Ok(FittedNumericImputer { fill: 0.0 });
        }

        observed.sort_by(f64::total_cmp);
        let fill = match self.strategy {
            ImputeStrategy::Median => {
                let mid = observed.len() / 2;
                if observed.len() % 2 == 0 {
                    (observed[mid - 1] + observed[mid]) / 2.0
                } else {
                    observed[mid]
                }
            }
            ImputeStrategy::MostFrequent => {
                // Sorted input: runs of equal values are contiguous, first longest run wins.
                let mut best = observed[0];
                let mut best_count = 0;
                let mut i = 0;
                while i < observed.len() {
                    let mut j = i;
                    while j < observed.len() && observed[j] == observed[i] {
                        j += 1;
                    }
                    if j - i > best_count {
                        best_count = j - i;
                        best = observed[i];
                    }
                    i = j;
                }
                best
            }
        };
        Ok(FittedNumericImputer { fill })
    }

    /// Learn the fill value for a text column.
    pub fn fit_text(&self, name: &str, values: &[Option<String>]) -> MlResult<FittedTextImputer> {
        if self.strategy != ImputeStrategy::MostFrequent {
            return Err(MlError::InvalidParameter(format!(
                "{:?} imputation is not defined for text column `{}`",
                self.strategy, name
            )));
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *counts.entry(v.as_str()).or_insert(0) += 1;
        }

        // BTreeMap iterates in sorted order, so the first maximum is the smallest value.
        let mut best: Option<(&str, usize)> = None;
        for (value, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }

        let fill = match best {
            Some((value, _)) => value.to_string(),
            None => {
                warn!(column = name, "no observed values at fit time, imputing \"{}\"", MISSING_TEXT_FILL);
                MISSING_TEXT_FILL.to_string()
            }
        };
        Ok(FittedTextImputer { fill })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNumericImputer {
    fill: f64,
}

impl FittedNumericImputer {
    pub fn fill(&self) -> f64 {
        self.fill
    }

    pub fn transform(&self, values: &[Option<f64>]) -> Vec<f64> {
        values.iter().map(|v| v.unwrap_or(self.fill)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTextImputer {
    fill: String,
}

impl FittedTextImputer {
    pub fn fill(&self) -> &str {
        &self.fill
    }

    pub fn transform(&self, values: &[Option<String>]) -> Vec<String> {
        values
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| self.fill.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        let imp = SimpleImputer::new(ImputeStrategy::Median);
        let odd = imp.fit_numeric("a", &[Some(3.0), None, Some(1.0), Some(2.0)]).unwrap();
        assert_eq!(odd.fill(), 2.0);
        let even = imp.fit_numeric("a", &[Some(4.0), Some(1.0), Some(2.0), Some(3.0)]).unwrap();
        assert_eq!(even.fill(), 2.5);
        assert_eq!(odd.transform(&[None, Some(9.0)]), vec![2.0, 9.0]);
    }

    #[test]
    fn test_all_missing_numeric_imputes_zero() {
        let imp = SimpleImputer::new(ImputeStrategy::Median);
        let fitted = imp.fit_numeric("a", &[None, None]).unwrap();
        assert_eq!(fitted.transform(&[None]), vec![0.0]);
    }

    #[test]
    fn test_most_frequent_text_breaks_ties_by_order() {
        let imp = SimpleImputer::new(ImputeStrategy::MostFrequent);
        let values = vec![
            Some("b".to_string()),
            Some("a".to_string()),
            None,
            Some("b".to_string()),
            Some("a".to_string()),
        ];
        let fitted = imp.fit_text("c", &values).unwrap();
        assert_eq!(fitted.fill(), "a");
        assert_eq!(
            fitted.transform(&[None, Some("z".into())]),
            vec!["a".to_string(), "z".to_string()]
        );
    }

    #[test]
    fn test_most_frequent_numeric() {
        let imp = SimpleImputer::new(ImputeStrategy::MostFrequent);
        let fitted = imp
            .fit_numeric("a", &[Some(5.0), Some(1.0), Some(5.0), Some(1.0), Some(7.0)])
            .unwrap();
        assert_eq!(fitted.fill(), 1.0);
    }

    #[test]
    fn test_median_on_text_is_rejected() {
        let imp = SimpleImputer::new(ImputeStrategy::Median);
        assert!(imp.fit_text("c", &[Some("x".into())]).is_err());
    }

    #[test]
    fn test_all_missing_text() {
        let imp = SimpleImputer::new(ImputeStrategy::MostFrequent);
        let fitted = imp.fit_text("c", &[None, None]).unwrap();
        assert_eq!(fitted.fill(), MISSING_TEXT_FILL);
    }
}
