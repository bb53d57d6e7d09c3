use house_price_core::{Matrix, MlError, MlResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision_tree::{check_training_data, DecisionTreeRegressor};

/// How many features each split may consider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    /// `floor(sqrt(p))`, at least 1.
    Sqrt,
    /// `ceil(fraction * p)`, at least 1.
    Fraction(f64),
}

impl MaxFeatures {
    pub fn resolve(self, p: usize) -> usize {
        let k = match self {
            MaxFeatures::All => p,
            MaxFeatures::Sqrt => (p as f64).sqrt() as usize,
            MaxFeatures::Fraction(f) => (p as f64 * f).ceil() as usize,
        };
        k.clamp(1, p.max(1))
    }
}

/// Random Forest Regressor: bagged CART trees averaged together.
///
/// Every tree gets its own seed, drawn up front from the forest seed, so
/// the trees can be grown in parallel and still reproduce exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: Option<u64>,
    trees: Vec<DecisionTreeRegressor>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, max_depth: usize, max_features: MaxFeatures) -> Self {
        RandomForestRegressor {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
            bootstrap: true,
            seed: Some(42),
            trees: Vec::new(),
        }
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(MlError::InvalidParameter("n_estimators must be at least 1".into()));
        }

        let (n, p) = x.shape();
        let max_features = self.max_features.resolve(p);
        let columns = x.to_columns();

        let mut base_rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| base_rng.gen()).collect();
        let (max_depth, min_split, min_leaf, bootstrap) = (
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
            self.bootstrap,
        );

        debug!(trees = self.n_estimators, max_features, rows = n, "growing forest");
        self.trees = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut tree = DecisionTreeRegressor::new(max_depth, min_split, min_leaf)
                    .with_max_features(Some(max_features))
                    .with_seed(Some(seed));
                tree.fit_sample(&columns, y, sample, &mut rng);
                tree
            })
            .collect();

        Ok(())
    }

    /// Every tree must be valid and all of them must agree on the width.
    pub fn validate(&self) -> MlResult<()> {
        let width = self.n_features();
        for tree in &self.trees {
            tree.validate()?;
            if tree.n_features() != width {
                return Err(MlError::DimensionMismatch(
                    "forest trees were fitted on different widths".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> Option<usize> {
        self.trees.first().and_then(DecisionTreeRegressor::n_features)
    }

    pub fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        let Some(first) = self.trees.first() else {
            return Err(MlError::NotFitted("RandomForestRegressor".into()));
        };
        let mut sum = first.predict(x)?;
        for tree in &self.trees[1..] {
            for (s, p) in sum.iter_mut().zip(tree.predict(x)?) {
                *s += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n_trees).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonlinear(n: usize) -> (Matrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64;
                vec![a, ((i * 31) % 17) as f64 / 17.0]
            })
            .collect();
        let y = rows.iter().map(|r| (r[0] * 6.0).sin() * 10.0 + r[1]).collect();
        (Matrix::from_vec2d(&rows).unwrap(), y)
    }

    #[test]
    fn test_random_forest_fits_nonlinear_signal() {
        let (x, y) = nonlinear(200);
        let mut rf = RandomForestRegressor::new(30, 8, MaxFeatures::All);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 30);

        let pred = rf.predict(&x).unwrap();
        let mse: f64 = pred.iter().zip(&y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64;
        let var: f64 = {
            let mean = y.iter().sum::<f64>() / y.len() as f64;
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / y.len() as f64
        };
        assert!(mse < 0.1 * var, "mse {} vs variance {}", mse, var);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = nonlinear(80);
        let mut a = RandomForestRegressor::new(10, 6, MaxFeatures::Sqrt).with_min_samples_split(5);
        let mut b = RandomForestRegressor::new(10, 6, MaxFeatures::Sqrt).with_min_samples_split(5);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(300), 17);
        assert_eq!(MaxFeatures::Sqrt.resolve(2), 1);
        assert_eq!(MaxFeatures::All.resolve(4), 4);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(5), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(0), 1);
    }

    #[test]
    fn test_validate_mixed_widths() {
        let (x, y) = nonlinear(40);
        let mut rf = RandomForestRegressor::new(3, 4, MaxFeatures::All);
        rf.fit(&x, &y).unwrap();
        rf.validate().unwrap();
        assert_eq!(rf.n_features(), Some(2));

        let mut narrow = DecisionTreeRegressor::new(2, 2, 1);
        narrow.fit(&Matrix::from_vec2d(&[vec![0.0], vec![1.0]]).unwrap(), &[0.0, 1.0]).unwrap();
        rf.trees.push(narrow);
        assert!(matches!(rf.validate(), Err(MlError::DimensionMismatch(_))));
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForestRegressor::new(3, 3, MaxFeatures::All);
        assert!(matches!(rf.predict(&Matrix::zeros(1, 1)), Err(MlError::NotFitted(_))));
    }
}
