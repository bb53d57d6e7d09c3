use crate::split::train_test_split;
use house_price_core::{Column, ColumnKind, MlError, MlResult, Table};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cleaning and split constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Columns whose missing fraction exceeds this are dropped.
    pub missing_threshold: f64,
    /// Identifier columns removed before modelling.
    pub id_columns: Vec<String>,
    pub target: String,
    pub valid_ratio: f64,
    pub seed: u64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        CleanConfig {
            missing_threshold: 0.95,
            id_columns: vec!["Order".to_string(), "PID".to_string()],
            target: "SalePrice".to_string(),
            valid_ratio: 0.2,
            seed: 42,
        }
    }
}

/// Which column plays which part after cleaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
    pub target: String,
    /// Columns removed for exceeding the missing threshold.
    pub dropped_sparse: Vec<String>,
    /// Identifier columns that were present and removed.
    pub dropped_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CleanSplit {
    pub roles: ColumnRoles,
    pub x_train: Table,
    pub x_valid: Table,
    pub y_train: Vec<f64>,
    pub y_valid: Vec<f64>,
}

/// Drop every column, other than `keep`, whose missing fraction exceeds
/// `threshold`. Returns the dropped names in table order.
pub fn drop_sparse_columns(table: &mut Table, threshold: f64, keep: &str) -> Vec<String> {
    let sparse: Vec<String> = table
        .iter()
        .filter(|(name, col)| *name != keep && col.missing_ratio() > threshold)
        .map(|(name, _)| name.to_string())
        .collect();
    for name in &sparse {
        table.drop_column(name);
    }
    sparse
}

/// Numeric columns become numerical features, text columns categorical.
pub fn partition_columns(table: &Table, target: &str) -> (Vec<String>, Vec<String>) {
    let mut numerical = Vec::new();
    let mut categorical = Vec::new();
    for (name, col) in table.iter() {
        if name == target {
            continue;
        }
        match col.kind() {
            ColumnKind::Numeric => numerical.push(name.to_string()),
            ColumnKind::Text => categorical.push(name.to_string()),
        }
    }
    (numerical, categorical)
}

/// Clean the raw table, assign column roles and split off a validation set.
pub fn clean_and_split(mut raw: Table, config: &CleanConfig) -> MlResult<CleanSplit> {
    if raw.n_rows() < 2 {
        return Err(MlError::EmptyData(format!(
            "need at least 2 rows to split, got {}",
            raw.n_rows()
        )));
    }

    let dropped_sparse = drop_sparse_columns(&mut raw, config.missing_threshold, &config.target);
    if !dropped_sparse.is_empty() {
        info!(
            count = dropped_sparse.len(),
            columns = ?dropped_sparse,
            "dropped columns above {:.0}% missing",
            config.missing_threshold * 100.0
        );
    }

    let dropped_ids: Vec<String> = config
        .id_columns
        .iter()
        .filter(|c| raw.drop_column(c))
        .cloned()
        .collect();
    if !dropped_ids.is_empty() {
        info!(columns = ?dropped_ids, "dropped identifier columns");
    }

    let y = match raw.remove_column(&config.target) {
        Some(Column::Numeric(values)) => values
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| MlError::MissingTarget {
                    column: config.target.clone(),
                    row,
                })
            })
            .collect::<MlResult<Vec<f64>>>()?,
        Some(Column::Text(_)) => {
            return Err(MlError::ColumnKind {
                column: config.target.clone(),
                expected: ColumnKind::Numeric,
            })
        }
        None => return Err(MlError::MissingColumn(config.target.clone())),
    };
    if y.iter().any(|v| !v.is_finite()) {
        return Err(MlError::NonFinite(format!("target `{}`", config.target)));
    }

    let (numerical, categorical) = partition_columns(&raw, &config.target);
    if numerical.is_empty() && categorical.is_empty() {
        return Err(MlError::EmptyData("no feature columns left after cleaning".into()));
    }
    info!(
        numerical = numerical.len(),
        categorical = categorical.len(),
        "assigned column roles"
    );

    let (x_train, x_valid, y_train, y_valid) =
        train_test_split(&raw, &y, config.valid_ratio, Some(config.seed))?;
    info!(train = x_train.n_rows(), valid = x_valid.n_rows(), "split dataset");

    Ok(CleanSplit {
        roles: ColumnRoles {
            numerical,
            categorical,
            target: config.target.clone(),
            dropped_sparse,
            dropped_ids,
        },
        x_train,
        x_valid,
        y_train,
        y_valid,
    })
}
