use crate::error::{PipelineError, PipelineResult};
use crate::estimator::TrainedModel;
use crate::settings::ProjectPaths;
use house_price_core::{Matrix, MlError, MlResult};
use house_price_io::{load_bincode, remove_if_exists, save_bincode, IoError};
use house_price_preprocessing::FittedColumnTransformer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Transformed training and validation arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedData {
    pub x_train: Matrix,
    pub x_valid: Matrix,
    pub y_train: Vec<f64>,
    pub y_valid: Vec<f64>,
}

impl ProcessedData {
    /// Row counts agree, both matrices share a width and nothing is NaN.
    pub fn validate(&self) -> MlResult<()> {
        if self.x_train.rows() != self.y_train.len() || self.x_valid.rows() != self.y_valid.len() {
            return Err(MlError::DimensionMismatch(format!(
                "processed arrays disagree: X_train {} rows / y_train {}, X_valid {} rows / y_valid {}",
                self.x_train.rows(),
                self.y_train.len(),
                self.x_valid.rows(),
                self.y_valid.len()
            )));
        }
        if self.x_train.cols() != self.x_valid.cols() {
            return Err(MlError::DimensionMismatch(format!(
                "X_train has {} columns, X_valid {}",
                self.x_train.cols(),
                self.x_valid.cols()
            )));
        }
        let targets_finite = self.y_train.iter().chain(&self.y_valid).all(|v| v.is_finite());
        if !self.x_train.all_finite() || !self.x_valid.all_finite() || !targets_finite {
            return Err(MlError::NonFinite("processed arrays".into()));
        }
        Ok(())
    }
}

// ─── Writing ────────────────────────────────────────────────────────────

pub fn save_processed(paths: &ProjectPaths, data: &ProcessedData) -> PipelineResult<()> {
    save_bincode(&data.x_train, &paths.x_train)?;
    save_bincode(&data.x_valid, &paths.x_valid)?;
    save_bincode(&data.y_train, &paths.y_train)?;
    save_bincode(&data.y_valid, &paths.y_valid)?;
    info!(
        dir = %paths.processed_dir.display(),
        train = data.x_train.rows(),
        valid = data.x_valid.rows(),
        features = data.x_train.cols(),
        "saved processed arrays"
    );
    Ok(())
}

pub fn save_preprocessor(paths: &ProjectPaths, pipeline: &FittedColumnTransformer) -> PipelineResult<()> {
    save_bincode(pipeline, &paths.preprocessor)?;
    info!(path = %paths.preprocessor.display(), "saved preprocessor");
    Ok(())
}

/// Replaces any previous best model.
pub fn save_best_model(paths: &ProjectPaths, model: &TrainedModel) -> PipelineResult<()> {
    remove_best_model(paths)?;
    save_bincode(model, &paths.best_model)?;
    info!(path = %paths.best_model.display(), kind = model.kind(), "saved best model");
    Ok(())
}

pub fn save_artifacts(
    paths: &ProjectPaths,
    pipeline: &FittedColumnTransformer,
    model: &TrainedModel,
) -> PipelineResult<()> {
    save_preprocessor(paths, pipeline)?;
    save_best_model(paths, model)
}

// ─── Reading ────────────────────────────────────────────────────────────

fn load_artifact<T: DeserializeOwned>(path: &Path, rerun: &'static str) -> PipelineResult<T> {
    load_bincode(path).map_err(|source: IoError| PipelineError::Artifact {
        path: path.to_path_buf(),
        rerun,
        source,
    })
}

fn invalid<'a>(path: &'a Path, rerun: &'static str) -> impl FnOnce(MlError) -> PipelineError + 'a {
    move |source| PipelineError::InvalidArtifact {
        path: path.to_path_buf(),
        rerun,
        source,
    }
}

pub fn load_processed(paths: &ProjectPaths) -> PipelineResult<ProcessedData> {
    let data = ProcessedData {
        x_train: load_artifact(&paths.x_train, "dataset")?,
        x_valid: load_artifact(&paths.x_valid, "dataset")?,
        y_train: load_artifact(&paths.y_train, "dataset")?,
        y_valid: load_artifact(&paths.y_valid, "dataset")?,
    };
    data.validate().map_err(invalid(&paths.processed_dir, "dataset"))?;
    Ok(data)
}

pub fn load_preprocessor(paths: &ProjectPaths) -> PipelineResult<FittedColumnTransformer> {
    let pipeline: FittedColumnTransformer = load_artifact(&paths.preprocessor, "dataset")?;
    pipeline.validate().map_err(invalid(&paths.preprocessor, "dataset"))?;
    Ok(pipeline)
}

pub fn load_best_model(paths: &ProjectPaths) -> PipelineResult<TrainedModel> {
    let model: TrainedModel = load_artifact(&paths.best_model, "train")?;
    model.validate().map_err(invalid(&paths.best_model, "train"))?;
    Ok(model)
}

/// Fitted preprocessor and best model, as needed for inference. The model
/// must have been trained on the preprocessor's output width.
pub fn load_artifacts(paths: &ProjectPaths) -> PipelineResult<(FittedColumnTransformer, TrainedModel)> {
    let pipeline = load_preprocessor(paths)?;
    let model = load_best_model(paths)?;
    let width = pipeline.n_features_out();
    match model.n_features() {
        Some(n) if n == width => Ok((pipeline, model)),
        Some(n) => Err(invalid(&paths.best_model, "train")(MlError::DimensionMismatch(format!(
            "model expects {} features, preprocessor produces {}",
            n, width
        )))),
        None => Err(invalid(&paths.best_model, "train")(MlError::NotFitted(
            model.kind().to_string(),
        ))),
    }
}

// ─── Cleanup ────────────────────────────────────────────────────────────

/// Delete the processed arrays and the preprocessor. Missing files are fine.
pub fn remove_processed(paths: &ProjectPaths) -> PipelineResult<()> {
    let mut removed = 0;
    for path in [
        &paths.x_train,
        &paths.x_valid,
        &paths.y_train,
        &paths.y_valid,
        &paths.preprocessor,
    ] {
        if remove_if_exists(path)? {
            removed += 1;
        }
    }
    if removed > 0 {
        info!(removed, "removed previous processed artifacts");
    }
    Ok(())
}

pub fn remove_best_model(paths: &ProjectPaths) -> PipelineResult<()> {
    if remove_if_exists(&paths.best_model)? {
        info!(path = %paths.best_model.display(), "removed previous best model");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use house_price_linear::LinearRegression;

    fn processed() -> ProcessedData {
        ProcessedData {
            x_train: Matrix::from_vec2d(&[vec![1.0, 0.5], vec![2.0, -0.25]]).unwrap(),
            x_valid: Matrix::from_vec2d(&[vec![3.0, 1.0 / 3.0]]).unwrap(),
            y_train: vec![100.0, 200.0],
            y_valid: vec![300.0],
        }
    }

    #[test]
    fn test_processed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        save_processed(&paths, &processed()).unwrap();
        assert_eq!(load_processed(&paths).unwrap(), processed());
    }

    #[test]
    fn test_missing_processed_asks_for_dataset_run() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        match load_processed(&paths) {
            Err(PipelineError::Artifact { rerun, .. }) => assert_eq!(rerun, "dataset"),
            other => panic!("expected artifact error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_model_asks_for_train_run() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let x = house_price_core::Table::from_columns(vec![(
            "Lot Area".to_string(),
            house_price_core::Column::Numeric(vec![Some(1.0), Some(2.0)]),
        )])
        .unwrap();
        let pipeline = house_price_preprocessing::build_pipeline(&["Lot Area".to_string()], &[])
            .fit(&x)
            .unwrap();
        save_preprocessor(&paths, &pipeline).unwrap();

        let err = load_artifacts(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::Artifact { rerun: "train", .. }));
        assert!(err.to_string().contains("house-price train"));
    }

    #[test]
    fn test_decodable_but_inconsistent_artifacts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());

        let mut data = processed();
        data.y_valid.push(400.0);
        save_processed(&paths, &data).unwrap();
        let err = load_processed(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArtifact { rerun: "dataset", .. }));
        assert!(err.to_string().contains("house-price dataset"));

        let mut nan_model = LinearRegression::new(true);
        nan_model.weights = Some(vec![f64::NAN, 1.0]);
        nan_model.bias = Some(0.0);
        save_best_model(&paths, &TrainedModel::Linear(nan_model)).unwrap();
        assert!(matches!(
            load_best_model(&paths),
            Err(PipelineError::InvalidArtifact { rerun: "train", .. })
        ));
    }

    #[test]
    fn test_model_width_must_match_preprocessor() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let x = house_price_core::Table::from_columns(vec![(
            "Lot Area".to_string(),
            house_price_core::Column::Numeric(vec![Some(1.0), Some(2.0), Some(4.0)]),
        )])
        .unwrap();
        let (pipeline, xt) = house_price_preprocessing::build_pipeline(&["Lot Area".to_string()], &[])
            .fit_transform(&x)
            .unwrap();

        let mut matching = LinearRegression::new(true);
        matching.fit(&xt, &[1.0, 2.0, 4.0]).unwrap();
        save_artifacts(&paths, &pipeline, &TrainedModel::Linear(matching)).unwrap();
        load_artifacts(&paths).unwrap();

        let wide = Matrix::from_vec2d(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let mut mismatched = LinearRegression::new(true);
        mismatched.fit(&wide, &[1.0, 2.0, 3.0]).unwrap();
        save_best_model(&paths, &TrainedModel::Linear(mismatched)).unwrap();
        assert!(matches!(
            load_artifacts(&paths),
            Err(PipelineError::InvalidArtifact { rerun: "train", .. })
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        save_processed(&paths, &processed()).unwrap();
        save_best_model(&paths, &TrainedModel::Linear(LinearRegression::new(true))).unwrap();

        remove_processed(&paths).unwrap();
        remove_processed(&paths).unwrap();
        assert!(!paths.x_train.exists());
        assert!(paths.best_model.exists());

        remove_best_model(&paths).unwrap();
        remove_best_model(&paths).unwrap();
        assert!(!paths.best_model.exists());
    }
}
