use house_price_core::{Matrix, MlError, MlResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// A node in the decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    /// Internal node: rows with `x[feature_idx] <= threshold` go left.
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    /// Leaf: mean target of the training rows that reached it.
    Leaf { value: f64 },
}

impl TreeNode {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Every split reads a feature below `n_features` and every value is usable.
    fn validate(&self, n_features: usize) -> MlResult<()> {
        match self {
            TreeNode::Leaf { value } if value.is_finite() => Ok(()),
            TreeNode::Leaf { .. } => Err(MlError::NonFinite("tree leaf value".into())),
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if *feature_idx >= n_features {
                    return Err(MlError::IndexOutOfBounds {
                        index: *feature_idx,
                        axis: 1,
                        size: n_features,
                    });
                }
                if threshold.is_nan() {
                    return Err(MlError::NonFinite("tree split threshold".into()));
                }
                left.validate(n_features)?;
                right.validate(n_features)
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Best split found for one node.
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// Decision Tree Regressor using CART (MSE criterion).
///
/// Splits are found by sorting the node's rows per feature and scanning
/// prefix sums, so each candidate feature costs `O(m log m)` at a node of
/// `m` rows. With `max_features` set, each node draws its own random
/// feature subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub seed: Option<u64>,
    n_features: usize,
    tree: Option<TreeNode>,
}

impl DecisionTreeRegressor {
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeRegressor {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            max_features: None,
            seed: Some(42),
            n_features: 0,
            tree: None,
        }
    }

    /// Number of features considered at every split; `None` means all.
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_training_data(x, y)?;
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let columns = x.to_columns();
        self.fit_sample(&columns, y, (0..x.rows()).collect(), &mut rng);
        Ok(())
    }

    /// Grow the tree on `sample`, a list of row indices that may repeat
    /// (bootstrap). `columns` is the column-major training matrix.
    pub(crate) fn fit_sample(
        &mut self,
        columns: &[Vec<f64>],
        y: &[f64],
        mut sample: Vec<usize>,
        rng: &mut StdRng,
    ) {
        self.n_features = columns.len();
        self.tree = Some(self.build_tree(columns, y, &mut sample, 0, rng));
    }

    fn build_tree(
        &self,
        columns: &[Vec<f64>],
        y: &[f64],
        indices: &mut [usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> TreeNode {
        let value = mean_value(y, indices);
        if depth >= self.max_depth
            || indices.len() < self.min_samples_split.max(2)
            || indices.len() < 2 * self.min_samples_leaf.max(1)
        {
            return TreeNode::Leaf { value };
        }

        // Pure node: nothing left to explain.
        let first = y[indices[0]];
        if indices.iter().all(|&i| (y[i] - first).abs() <= f64::EPSILON * first.abs().max(1.0)) {
            return TreeNode::Leaf { value };
        }

        let Some(best) = self.find_split(columns, y, indices, rng) else {
            return TreeNode::Leaf { value };
        };

        let col = &columns[best.feature];
        let mut boundary = 0;
        for k in 0..indices.len() {
            if col[indices[k]] <= best.threshold {
                indices.swap(boundary, k);
                boundary += 1;
            }
        }
        let (left_idx, right_idx) = indices.split_at_mut(boundary);
        let left = self.build_tree(columns, y, left_idx, depth + 1, rng);
        let right = self.build_tree(columns, y, right_idx, depth + 1, rng);

        TreeNode::Split {
            feature_idx: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Search the features in random order. The first `max_features` are
    /// always evaluated; past that, the search stops at the first feature
    /// that produced a valid split.
    fn find_split(
        &self,
        columns: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let p = columns.len();
        let budget = self.max_features.unwrap_or(p).clamp(1, p.max(1));
        let mut features: Vec<usize> = (0..p).collect();
        if budget < p {
            features.shuffle(rng);
        }

        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let m = indices.len();
        let min_leaf = self.min_samples_leaf.max(1);
        let mut order: Vec<(f64, f64)> = Vec::with_capacity(m);
        let mut best: Option<SplitCandidate> = None;

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= budget && best.is_some() {
                break;
            }
            let col = &columns[feature];
            order.clear();
            order.extend(indices.iter().map(|&i| (col[i], y[i])));
            order.sort_by(|a, b| a.0.total_cmp(&b.0));
            if order[0].0 == order[m - 1].0 {
                continue;
            }

            // Minimizing SSE is maximizing sum_l²/n_l + sum_r²/n_r.
            let mut left_sum = 0.0;
            for k in 1..m {
                left_sum += order[k - 1].1;
                if k < min_leaf || m - k < min_leaf || order[k - 1].0 == order[k].0 {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (m - k) as f64;
                if best.as_ref().map_or(true, |b| score > b.score) {
                    let (lo, hi) = (order[k - 1].0, order[k].0);
                    let mid = lo + (hi - lo) / 2.0;
                    best = Some(SplitCandidate {
                        feature,
                        threshold: if mid < hi { mid } else { lo },
                        score,
                    });
                }
            }
        }

        let parent = total * total / m as f64;
        best.filter(|b| b.score > parent)
    }

    pub fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| MlError::NotFitted("DecisionTreeRegressor".into()))?;
        check_width(x, self.n_features)?;
        Ok(x.iter_rows().map(|row| tree.predict_row(row)).collect())
    }

    /// Check a deserialized tree before it is used for prediction.
    pub fn validate(&self) -> MlResult<()> {
        match &self.tree {
            Some(tree) => tree.validate(self.n_features),
            None => Ok(()),
        }
    }

    /// Width of the matrices the tree was fitted on.
    pub fn n_features(&self) -> Option<usize> {
        self.tree.as_ref().map(|_| self.n_features)
    }

    /// Depth of the fitted tree, 0 for a single leaf.
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeNode::depth)
    }
}

fn mean_value(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

pub(crate) fn check_training_data(x: &Matrix, y: &[f64]) -> MlResult<()> {
    if x.rows() != y.len() {
        return Err(MlError::DimensionMismatch(format!(
            "X has {} rows but y has {} values",
            x.rows(),
            y.len()
        )));
    }
    if x.rows() == 0 {
        return Err(MlError::EmptyData("cannot fit on zero rows".into()));
    }
    if !x.all_finite() || y.iter().any(|v| !v.is_finite()) {
        return Err(MlError::NonFinite("training data contains NaN or infinity".into()));
    }
    Ok(())
}

pub(crate) fn check_width(x: &Matrix, n_features: usize) -> MlResult<()> {
    if x.cols() != n_features {
        return Err(MlError::ShapeMismatch {
            expected: vec![x.rows(), n_features],
            got: vec![x.rows(), x.cols()],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tree_regressor() {
        let x = Matrix::from_vec2d(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![2.0, 4.0, 6.0, 8.0];

        let mut tree = DecisionTreeRegressor::new(10, 2, 1);
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();
        for i in 0..4 {
            assert!((pred[i] - y[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_step_function_picks_informative_feature() {
        // Feature 1 is noise; feature 0 carries a step at 5.
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, ((i * 7) % 3) as f64])
            .collect();
        let x = Matrix::from_vec2d(&rows).unwrap();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 9.0 }).collect();

        let mut tree = DecisionTreeRegressor::new(1, 2, 1);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), Some(1));
        let pred = tree.predict(&Matrix::from_vec2d(&[vec![4.4, 0.0], vec![4.6, 0.0]]).unwrap()).unwrap();
        assert_eq!(pred, vec![1.0, 9.0]);
    }

    #[test]
    fn test_max_depth_and_min_samples_split() {
        let x = Matrix::from_vec2d(&(0..16).map(|i| vec![i as f64]).collect::<Vec<_>>()).unwrap();
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();

        let mut shallow = DecisionTreeRegressor::new(2, 2, 1);
        shallow.fit(&x, &y).unwrap();
        assert_eq!(shallow.depth(), Some(2));

        let mut no_split = DecisionTreeRegressor::new(10, 17, 1);
        no_split.fit(&x, &y).unwrap();
        assert_eq!(no_split.depth(), Some(0));
    }

    #[test]
    fn test_constant_target_is_a_leaf() {
        let x = Matrix::from_vec2d(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let mut tree = DecisionTreeRegressor::new(5, 2, 1);
        tree.fit(&x, &[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(tree.depth(), Some(0));
        assert_eq!(tree.predict(&x).unwrap(), vec![7.0; 3]);
    }

    #[test]
    fn test_validate_rejects_out_of_range_feature() {
        let x = Matrix::from_vec2d(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let mut tree = DecisionTreeRegressor::new(3, 2, 1);
        tree.fit(&x, &[1.0, 1.0, 5.0, 5.0]).unwrap();
        tree.validate().unwrap();

        // What a decodable but inconsistent artifact would hold.
        let mut corrupt = tree.clone();
        corrupt.n_features = 0;
        assert!(matches!(corrupt.validate(), Err(MlError::IndexOutOfBounds { .. })));

        let mut nan_leaf = tree;
        nan_leaf.tree = Some(TreeNode::Leaf { value: f64::NAN });
        assert!(nan_leaf.validate().is_err());
    }

    #[test]
    fn test_errors() {
        let tree = DecisionTreeRegressor::new(5, 2, 1);
        assert!(matches!(tree.predict(&Matrix::zeros(1, 1)), Err(MlError::NotFitted(_))));

        let mut tree = DecisionTreeRegressor::new(5, 2, 1);
        assert!(tree.fit(&Matrix::zeros(2, 1), &[1.0]).is_err());
        tree.fit(&Matrix::zeros(2, 1), &[1.0, 2.0]).unwrap();
        assert!(tree.predict(&Matrix::zeros(1, 3)).is_err());
    }
}
