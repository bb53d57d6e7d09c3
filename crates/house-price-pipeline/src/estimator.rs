use house_price_core::{Matrix, MlResult};
use house_price_linear::LinearRegression;
use house_price_tree::{GradientBoostingRegressor, RandomForestRegressor};
use serde::{Deserialize, Serialize};

/// Trait for supervised regressors.
pub trait Regressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()>;
    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>>;
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        LinearRegression::fit(self, x, y)
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        LinearRegression::predict(self, x)
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        RandomForestRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        RandomForestRegressor::predict(self, x)
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        GradientBoostingRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        GradientBoostingRegressor::predict(self, x)
    }
}

/// Any regressor the roster can produce. This is what gets persisted as
/// the best model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainedModel {
    Linear(LinearRegression),
    RandomForest(RandomForestRegressor),
    Boosting(GradientBoostingRegressor),
}

impl TrainedModel {
    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            TrainedModel::Linear(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Boosting(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::Linear(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Boosting(m) => m,
        }
    }

    /// Internal consistency of a decoded model.
    pub fn validate(&self) -> MlResult<()> {
        match self {
            TrainedModel::Linear(m) => m.validate(),
            TrainedModel::RandomForest(m) => m.validate(),
            TrainedModel::Boosting(m) => m.validate(),
        }
    }

    /// Width of the matrices the model was fitted on, `None` before fitting.
    pub fn n_features(&self) -> Option<usize> {
        match self {
            TrainedModel::Linear(m) => m.n_features(),
            TrainedModel::RandomForest(m) => m.n_features(),
            TrainedModel::Boosting(m) => m.n_features(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrainedModel::Linear(_) => "linear regression",
            TrainedModel::RandomForest(_) => "random forest",
            TrainedModel::Boosting(_) => "gradient boosting",
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        self.as_regressor().predict(x)
    }
}
