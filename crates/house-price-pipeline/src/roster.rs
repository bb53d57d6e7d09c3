use crate::estimator::TrainedModel;
use house_price_linear::LinearRegression;
use house_price_tree::{GradientBoostingRegressor, GrowPolicy, MaxFeatures, RandomForestRegressor};

pub const SEED: u64 = 42;

/// A named, not yet fitted model.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub name: String,
    pub model: TrainedModel,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, model: TrainedModel) -> Self {
        RosterEntry {
            name: name.into(),
            model,
        }
    }
}

/// The fixed candidate list. Order matters: it breaks RMSE ties.
pub fn default_roster() -> Vec<RosterEntry> {
    let forest = RandomForestRegressor::new(300, 20, MaxFeatures::Sqrt)
        .with_min_samples_split(5)
        .with_seed(Some(SEED));

    let depthwise = GradientBoostingRegressor::new(200, 0.05, 5)
        .with_subsample(0.8, 1)
        .with_colsample(0.8)
        .with_lambda(1.0);

    // Row subsampling is configured at 0.8 but with a bagging frequency of
    // 0, which leaves bagging off.
    let leafwise = GradientBoostingRegressor::new(200, 0.05, 7)
        .with_grow_policy(GrowPolicy::LeafWise, Some(31))
        .with_subsample(0.8, 0)
        .with_colsample(0.8)
        .with_min_samples_leaf(20)
        .with_lambda(0.0);

    vec![
        RosterEntry::new("LinearRegression", TrainedModel::Linear(LinearRegression::new(true))),
        RosterEntry::new("RandomForest", TrainedModel::RandomForest(forest)),
        RosterEntry::new("DepthwiseBoosting", TrainedModel::Boosting(depthwise)),
        RosterEntry::new("LeafwiseBoosting", TrainedModel::Boosting(leafwise)),
    ]
}
