use house_price_core::{Matrix, MlError, MlResult};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binning::BinnedMatrix;
use crate::decision_tree::{check_training_data, check_width};

/// Splits must improve the regularized objective by at least this much.
const MIN_SPLIT_GAIN: f64 = 1e-6;

/// Order in which a boosted tree expands its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowPolicy {
    /// Level by level, bounded by `max_depth`.
    DepthWise,
    /// Always split the leaf with the largest gain, bounded by `max_leaves`.
    LeafWise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum HistNode {
    Split {
        feature: usize,
        bin: u8,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// One boosted tree, stored as a flat arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct HistTree {
    nodes: Vec<HistNode>,
}

impl HistTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                HistNode::Leaf { value } => return *value,
                HistNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => id = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    fn predict_binned(&self, binned: &BinnedMatrix, row: usize) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                HistNode::Leaf { value } => return *value,
                HistNode::Split {
                    feature,
                    bin,
                    left,
                    right,
                    ..
                } => id = if binned.bin(*feature, row) <= *bin { *left } else { *right },
            }
        }
    }

    /// Children always sit after their parent in the arena, which rules out
    /// cycles; splits must read a feature below `n_features`.
    fn validate(&self, n_features: usize) -> MlResult<()> {
        if self.nodes.is_empty() {
            return Err(MlError::EmptyData("boosted tree has no nodes".into()));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                HistNode::Leaf { value } if !value.is_finite() => {
                    return Err(MlError::NonFinite("boosted tree leaf value".into()));
                }
                HistNode::Leaf { .. } => {}
                HistNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(MlError::IndexOutOfBounds {
                            index: *feature,
                            axis: 1,
                            size: n_features,
                        });
                    }
                    if threshold.is_nan() {
                        return Err(MlError::NonFinite("boosted tree split threshold".into()));
                    }
                    for &child in [left, right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(MlError::IndexOutOfBounds {
                                index: child,
                                axis: 0,
                                size: self.nodes.len(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, HistNode::Leaf { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitInfo {
    feature: usize,
    bin: u8,
    gain: f64,
}

/// A leaf that may still be split.
struct OpenLeaf {
    id: usize,
    depth: usize,
    rows: Vec<usize>,
    grad_sum: f64,
    split: Option<SplitInfo>,
}

/// Histogram gradient-boosted trees for squared-error regression.
///
/// Features are quantized once into at most `max_bins` bins; each node
/// builds per-bin gradient histograms and picks the split maximizing
///
/// ```text
/// G_L² / (n_L + λ) + G_R² / (n_R + λ) - G² / (n + λ)
/// ```
///
/// Leaves output `-learning_rate · G / (n + λ)`. Boosting starts from the
/// mean target.
///
/// Row sampling redraws `subsample · n` rows every `bagging_freq` rounds
/// (0 disables it); column sampling draws `colsample_bytree · p` features
/// per tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub max_leaves: Option<usize>,
    pub min_samples_leaf: usize,
    pub lambda: f64,
    pub subsample: f64,
    pub bagging_freq: usize,
    pub colsample_bytree: f64,
    pub max_bins: usize,
    pub grow_policy: GrowPolicy,
    pub seed: Option<u64>,
    n_features: usize,
    base_score: f64,
    trees: Vec<HistTree>,
}

impl GradientBoostingRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        GradientBoostingRegressor {
            n_estimators,
            learning_rate,
            max_depth: if max_depth == 0 { 3 } else { max_depth },
            max_leaves: None,
            min_samples_leaf: 1,
            lambda: 1.0,
            subsample: 1.0,
            bagging_freq: 0,
            colsample_bytree: 1.0,
            max_bins: 255,
            grow_policy: GrowPolicy::DepthWise,
            seed: Some(42),
            n_features: 0,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn with_grow_policy(mut self, policy: GrowPolicy, max_leaves: Option<usize>) -> Self {
        self.grow_policy = policy;
        self.max_leaves = max_leaves;
        self
    }

    pub fn with_subsample(mut self, subsample: f64, bagging_freq: usize) -> Self {
        self.subsample = subsample;
        self.bagging_freq = bagging_freq;
        self
    }

    pub fn with_colsample(mut self, colsample_bytree: f64) -> Self {
        self.colsample_bytree = colsample_bytree;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Leaf count of every fitted tree, in boosting order.
    pub fn leaves_per_tree(&self) -> Vec<usize> {
        self.trees.iter().map(HistTree::n_leaves).collect()
    }

    fn validate_params(&self) -> MlResult<()> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        if !fraction(self.subsample) || !fraction(self.colsample_bytree) {
            return Err(MlError::InvalidParameter(
                "subsample and colsample_bytree must be in (0, 1]".into(),
            ));
        }
        if !(self.learning_rate > 0.0) || self.lambda < 0.0 {
            return Err(MlError::InvalidParameter(
                "learning_rate must be positive and lambda non-negative".into(),
            ));
        }
        if matches!(self.max_leaves, Some(l) if l < 2) {
            return Err(MlError::InvalidParameter("max_leaves must be at least 2".into()));
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_training_data(x, y)?;
        self.validate_params()?;

        let (n, p) = x.shape();
        let binned = BinnedMatrix::fit(x, self.max_bins)?;
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        self.n_features = p;
        self.base_score = y.iter().sum::<f64>() / n as f64;
        self.trees.clear();

        let mut pred = vec![self.base_score; n];
        let mut rows: Vec<usize> = (0..n).collect();
        let bagging = self.subsample < 1.0 && self.bagging_freq > 0;
        let n_rows = ((self.subsample * n as f64).round() as usize).clamp(1, n);
        let n_cols = ((self.colsample_bytree * p as f64).round() as usize).clamp(1, p.max(1)).min(p);

        for round in 0..self.n_estimators {
            let grad: Vec<f64> = pred.iter().zip(y).map(|(p, t)| p - t).collect();

            if bagging && round % self.bagging_freq == 0 {
                rows = index::sample(&mut rng, n, n_rows).into_vec();
                rows.sort_unstable();
            }
            let mut features = if n_cols < p {
                index::sample(&mut rng, p, n_cols).into_vec()
            } else {
                (0..p).collect()
            };
            features.sort_unstable();

            let tree = self.grow_tree(&binned, &grad, rows.clone(), &features);
            for (i, v) in pred.iter_mut().enumerate() {
                *v += tree.predict_binned(&binned, i);
            }
            self.trees.push(tree);

            if (round + 1) % 50 == 0 {
                let rmse = (pred.iter().zip(y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / n as f64).sqrt();
                debug!(round = round + 1, train_rmse = rmse, "boosting progress");
            }
        }
        Ok(())
    }

    fn grow_tree(&self, binned: &BinnedMatrix, grad: &[f64], rows: Vec<usize>, features: &[usize]) -> HistTree {
        let mut nodes = vec![HistNode::Leaf { value: 0.0 }];
        let grad_sum: f64 = rows.iter().map(|&i| grad[i]).sum();
        let split = self.best_split(binned, grad, &rows, grad_sum, features, 0);
        let mut open = vec![OpenLeaf {
            id: 0,
            depth: 0,
            rows,
            grad_sum,
            split,
        }];
        let mut n_leaves = 1;

        while let Some(pos) = self.next_leaf(&open) {
            let leaf = open.remove(pos);
            let at_capacity = self.max_leaves.map_or(false, |m| n_leaves >= m);
            let Some(split) = leaf.split.filter(|_| !at_capacity) else {
                nodes[leaf.id] = HistNode::Leaf {
                    value: self.leaf_value(leaf.grad_sum, leaf.rows.len()),
                };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .iter()
                .copied()
                .partition(|&i| binned.bin(split.feature, i) <= split.bin);
            let left_id = nodes.len();
            nodes.push(HistNode::Leaf { value: 0.0 });
            nodes.push(HistNode::Leaf { value: 0.0 });
            nodes[leaf.id] = HistNode::Split {
                feature: split.feature,
                bin: split.bin,
                threshold: binned.edge(split.feature, split.bin as usize),
                left: left_id,
                right: left_id + 1,
            };
            n_leaves += 1;

            let depth = leaf.depth + 1;
            for (id, child_rows) in [(left_id, left_rows), (left_id + 1, right_rows)] {
                let g: f64 = child_rows.iter().map(|&i| grad[i]).sum();
                let split = self.best_split(binned, grad, &child_rows, g, features, depth);
                open.push(OpenLeaf {
                    id,
                    depth,
                    rows: child_rows,
                    grad_sum: g,
                    split,
                });
            }
        }
        HistTree { nodes }
    }

    /// Depth-wise expands in creation order (breadth first). Leaf-wise
    /// expands the highest-gain leaf first, earliest on ties, and only
    /// finalizes unsplittable leaves once no split remains.
    fn next_leaf(&self, open: &[OpenLeaf]) -> Option<usize> {
        if open.is_empty() {
            return None;
        }
        match self.grow_policy {
            GrowPolicy::DepthWise => Some(0),
            GrowPolicy::LeafWise => {
                let mut best: Option<(usize, f64)> = None;
                for (pos, leaf) in open.iter().enumerate() {
                    if let Some(s) = leaf.split {
                        if best.map_or(true, |(_, g)| s.gain > g) {
                            best = Some((pos, s.gain));
                        }
                    }
                }
                Some(best.map_or(0, |(pos, _)| pos))
            }
        }
    }

    fn leaf_value(&self, grad_sum: f64, count: usize) -> f64 {
        -self.learning_rate * grad_sum / (count as f64 + self.lambda)
    }

    fn best_split(
        &self,
        binned: &BinnedMatrix,
        grad: &[f64],
        rows: &[usize],
        grad_sum: f64,
        features: &[usize],
        depth: usize,
    ) -> Option<SplitInfo> {
        let n = rows.len();
        let min_leaf = self.min_samples_leaf.max(1);
        if depth >= self.max_depth || n < 2 * min_leaf {
            return None;
        }
        let lambda = self.lambda;
        let parent = grad_sum * grad_sum / (n as f64 + lambda);

        let per_feature: Vec<Option<SplitInfo>> = features
            .par_iter()
            .map(|&feature| {
                let n_bins = binned.n_bins(feature);
                if n_bins < 2 {
                    return None;
                }
                let column = binned.column(feature);
                let mut hist = vec![(0.0f64, 0usize); n_bins];
                for &i in rows {
                    let h = &mut hist[column[i] as usize];
                    h.0 += grad[i];
                    h.1 += 1;
                }

                let mut best: Option<SplitInfo> = None;
                let (mut g_left, mut n_left) = (0.0, 0usize);
                for (bin, &(g, c)) in hist.iter().enumerate().take(n_bins - 1) {
                    g_left += g;
                    n_left += c;
                    let n_right = n - n_left;
                    if n_left < min_leaf || c == 0 {
                        continue;
                    }
                    if n_right < min_leaf {
                        break;
                    }
                    let g_right = grad_sum - g_left;
                    let gain = g_left * g_left / (n_left as f64 + lambda)
                        + g_right * g_right / (n_right as f64 + lambda)
                        - parent;
                    if best.map_or(true, |b| gain > b.gain) {
                        best = Some(SplitInfo {
                            feature,
                            bin: bin as u8,
                            gain,
                        });
                    }
                }
                best
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitInfo>, s| match best {
                Some(b) if b.gain >= s.gain => Some(b),
                _ => Some(s),
            })
            .filter(|s| s.gain > MIN_SPLIT_GAIN)
    }

    /// Check a deserialized model before it is used for prediction.
    pub fn validate(&self) -> MlResult<()> {
        if !self.base_score.is_finite() {
            return Err(MlError::NonFinite("boosting base score".into()));
        }
        self.trees.iter().try_for_each(|t| t.validate(self.n_features))
    }

    pub fn n_features(&self) -> Option<usize> {
        (!self.trees.is_empty()).then_some(self.n_features)
    }

    pub fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted("GradientBoostingRegressor".into()));
        }
        check_width(x, self.n_features)?;
        Ok(x
            .iter_rows()
            .map(|row| self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rmse(a: &[f64], b: &[f64]) -> f64 {
        (a.iter().zip(b).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / a.len() as f64).sqrt()
    }

    fn data(n: usize) -> (Matrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 / n as f64, ((i * 13) % 7) as f64, ((i * 5) % 3) as f64])
            .collect();
        let y = rows
            .iter()
            .map(|r| 100.0 * r[0] * r[0] + 5.0 * r[1] - 3.0 * r[2])
            .collect();
        (Matrix::from_vec2d(&rows).unwrap(), y)
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let x = Matrix::from_vec2d(&(1..=10).map(|i| vec![i as f64]).collect::<Vec<_>>()).unwrap();
        let y: Vec<f64> = (1..=10).map(|i| 2.0 * i as f64 + 1.0).collect();

        let mut model = GradientBoostingRegressor::new(100, 0.1, 3).with_lambda(0.0);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        for i in 0..10 {
            assert!(
                (pred[i] - y[i]).abs() < 2.0,
                "prediction {} != expected {} at index {}",
                pred[i],
                y[i],
                i
            );
        }
    }

    #[test]
    fn test_depthwise_with_sampling_beats_the_mean() {
        let (x, y) = data(300);
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let mut model = GradientBoostingRegressor::new(200, 0.05, 5)
            .with_subsample(0.8, 1)
            .with_colsample(0.8);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        assert!(rmse(&pred, &y) < 0.2 * rmse(&vec![mean; y.len()], &y));
    }

    #[test]
    fn test_leafwise_respects_leaf_budget() {
        let (x, y) = data(300);
        let mut model = GradientBoostingRegressor::new(20, 0.05, 7)
            .with_grow_policy(GrowPolicy::LeafWise, Some(6))
            .with_min_samples_leaf(20)
            .with_lambda(0.0);
        model.fit(&x, &y).unwrap();
        let leaves = model.leaves_per_tree();
        assert_eq!(leaves.len(), 20);
        assert!(leaves.iter().all(|&l| l <= 6));
        assert_eq!(leaves[0], 6);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = data(120);
        let build = || {
            let mut m = GradientBoostingRegressor::new(30, 0.1, 4)
                .with_subsample(0.7, 1)
                .with_colsample(0.67);
            m.fit(&x, &y).unwrap();
            m
        };
        assert_eq!(build().predict(&x).unwrap(), build().predict(&x).unwrap());
    }

    #[test]
    fn test_binned_and_raw_traversal_agree() {
        let (x, y) = data(200);
        let mut model = GradientBoostingRegressor::new(10, 0.3, 4);
        model.fit(&x, &y).unwrap();
        let binned = BinnedMatrix::fit(&x, model.max_bins).unwrap();
        for tree in &model.trees {
            for (i, row) in x.iter_rows().enumerate() {
                assert_eq!(tree.predict_binned(&binned, i), tree.predict_row(row));
            }
        }
    }

    #[test]
    fn test_validate_catches_corrupt_arena() {
        let (x, y) = data(60);
        let mut model = GradientBoostingRegressor::new(5, 0.1, 3);
        model.fit(&x, &y).unwrap();
        model.validate().unwrap();
        assert_eq!(model.n_features(), Some(3));

        let mut dangling = model.clone();
        if let Some(HistNode::Split { left, .. }) = dangling.trees[0].nodes.first_mut() {
            *left = 10_000;
        }
        assert!(matches!(dangling.validate(), Err(MlError::IndexOutOfBounds { .. })));

        let mut cyclic = model.clone();
        if let Some(HistNode::Split { right, .. }) = cyclic.trees[0].nodes.first_mut() {
            *right = 0;
        }
        assert!(cyclic.validate().is_err());

        let mut narrow = model;
        narrow.n_features = 0;
        assert!(narrow.validate().is_err());
    }

    #[test]
    fn test_errors() {
        let model = GradientBoostingRegressor::new(5, 0.1, 3);
        assert!(matches!(model.predict(&Matrix::zeros(1, 1)), Err(MlError::NotFitted(_))));

        let (x, y) = data(20);
        let mut bad = GradientBoostingRegressor::new(5, 0.1, 3).with_subsample(0.0, 1);
        assert!(bad.fit(&x, &y).is_err());

        let mut ok = GradientBoostingRegressor::new(5, 0.1, 3);
        ok.fit(&x, &y).unwrap();
        assert!(ok.predict(&Matrix::zeros(1, 2)).is_err());
    }
}
