use crate::artifacts::{
    load_processed, remove_best_model, remove_processed, save_best_model, save_preprocessor,
    save_processed, ProcessedData,
};
use crate::error::PipelineResult;
use crate::roster::default_roster;
use crate::settings::{ProjectPaths, Settings};
use crate::trainer::{select_best, train_and_evaluate, Candidate};
use house_price_core::Table;
use house_price_datasets::ensure_dataset;
use house_price_io::read_table;
use house_price_preprocessing::{
    build_pipeline, clean_and_split, CleanConfig, ColumnRoles, FittedColumnTransformer,
};
use tracing::info;

/// Clean and split a raw table, then fit the preprocessor on the training
/// rows and transform both subsets with it.
pub fn prepare(
    raw: Table,
    config: &CleanConfig,
) -> PipelineResult<(FittedColumnTransformer, ProcessedData, ColumnRoles)> {
    let split = clean_and_split(raw, config)?;
    let (pipeline, x_train) =
        build_pipeline(&split.roles.numerical, &split.roles.categorical).fit_transform(&split.x_train)?;
    let x_valid = pipeline.transform(&split.x_valid)?;
    info!(
        features_in = split.roles.numerical.len() + split.roles.categorical.len(),
        features_out = pipeline.n_features_out(),
        "fitted preprocessing pipeline"
    );

    let data = ProcessedData {
        x_train,
        x_valid,
        y_train: split.y_train,
        y_valid: split.y_valid,
    };
    Ok((pipeline, data, split.roles))
}

/// Dataset run: drop stale processed files, make sure the raw CSV is
/// present, then prepare and persist the arrays and the preprocessor.
pub fn run_dataset(settings: &Settings, force_refresh: bool) -> PipelineResult<ColumnRoles> {
    let paths = settings.paths();
    remove_processed(&paths)?;

    let csv = ensure_dataset(&settings.acquisition(), force_refresh)?;
    let raw = read_table(&csv)?;
    info!(path = %csv.display(), rows = raw.n_rows(), cols = raw.n_cols(), "loaded raw dataset");

    let (pipeline, data, roles) = prepare(raw, &CleanConfig::default())?;
    save_processed(&paths, &data)?;
    save_preprocessor(&paths, &pipeline)?;
    Ok(roles)
}

/// Training run: fit the default roster on the processed arrays, keep the
/// lowest-RMSE candidate and persist it as the best model.
pub fn run_training(paths: &ProjectPaths) -> PipelineResult<Candidate> {
    let data = load_processed(paths)?;
    remove_best_model(paths)?;

    let candidates = train_and_evaluate(
        default_roster(),
        &data.x_train,
        &data.x_valid,
        &data.y_train,
        &data.y_valid,
    )?;
    let best = select_best(candidates)?;
    save_best_model(paths, &best.model)?;
    Ok(best)
}
