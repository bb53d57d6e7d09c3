use crate::coerce::{CoercionError, FeatureRecord, FeatureValue};
use crate::error::ServeResult;
use crate::schema::HouseFeatures;
use house_price_core::{Column, ColumnKind, Table};
use house_price_pipeline::{load_artifacts, PipelineResult, ProjectPaths, Regressor, TrainedModel};
use house_price_preprocessing::FittedColumnTransformer;
use tracing::{debug, info};

/// Fitted preprocessor plus best model, frozen for inference.
#[derive(Debug, Clone)]
pub struct Predictor {
    pipeline: FittedColumnTransformer,
    model: TrainedModel,
}

impl Predictor {
    pub fn new(pipeline: FittedColumnTransformer, model: TrainedModel) -> Self {
        Predictor { pipeline, model }
    }

    pub fn load(paths: &ProjectPaths) -> PipelineResult<Self> {
        let (pipeline, model) = load_artifacts(paths)?;
        info!(
            model = model.kind(),
            inputs = pipeline.numerical_columns().len() + pipeline.categorical_columns().len(),
            "loaded predictor"
        );
        Ok(Predictor::new(pipeline, model))
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// One-row table holding exactly the columns the pipeline was fitted on.
    /// Columns the record does not mention are missing.
    pub fn to_table(&self, record: &FeatureRecord) -> ServeResult<Table> {
        let mut columns = Vec::new();
        for (column, kind) in self.pipeline.input_columns() {
            let field = HouseFeatures::by_column(column);
            let value = field.and_then(|f| record.get(f.name));
            let cell = match (kind, value) {
                (_, None) => match kind {
                    ColumnKind::Numeric => Column::Numeric(vec![None]),
                    ColumnKind::Text => Column::Text(vec![None]),
                },
                (ColumnKind::Numeric, Some(v)) => {
                    let number = v.as_f64().ok_or_else(|| CoercionError::InvalidValue {
                        field: field.map_or(column, |f| f.name).to_string(),
                    })?;
                    Column::Numeric(vec![Some(number)])
                }
                (ColumnKind::Text, Some(v)) => Column::Text(vec![Some(self.category_label(column, v))]),
            };
            columns.push((column.to_string(), cell));
        }

        for (name, _) in record.iter() {
            let used = HouseFeatures::field(name)
                .map(|f| self.pipeline.input_columns().any(|(c, _)| c == f.column))
                .unwrap_or(false);
            if !used {
                debug!(field = name, "field not used by the fitted pipeline");
            }
        }
        Ok(Table::from_columns(columns)?)
    }

    /// Label for `value` in a text column. Text is used verbatim. A number
    /// takes the spelling the training CSV used for it (`"2.0"` and `"2"`
    /// are the same category), falling back to its plain rendering.
    fn category_label(&self, column: &str, value: &FeatureValue) -> String {
        let number = match value {
            FeatureValue::Text(s) => return s.clone(),
            FeatureValue::Integer(i) => *i as f64,
            FeatureValue::Float(f) => *f,
        };
        self.pipeline
            .vocabulary(column)
            .and_then(|vocab| {
                vocab
                    .iter()
                    .find(|label| label.trim().parse::<f64>().ok() == Some(number))
            })
            .cloned()
            .unwrap_or_else(|| value.to_text())
    }

    /// Predicted sale price for one house. Never refits anything.
    pub fn predict(&self, record: &FeatureRecord) -> ServeResult<f64> {
        let table = self.to_table(record)?;
        let x = self.pipeline.transform(&table)?;
        let prediction = self.model.predict(&x)?;
        let price = prediction.first().copied().ok_or_else(|| {
            house_price_core::MlError::EmptyData("model returned no prediction".into())
        })?;
        debug!(fields = record.len(), price, "predicted");
        Ok(price)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use house_price_linear::LinearRegression;
    use house_price_preprocessing::build_pipeline;

    /// Linear fit of `100k + 1k per year after 1990 + 20k in CollgCr`.
    pub(crate) fn toy_predictor() -> Predictor {
        let years: Vec<Option<f64>> = (0..12).map(|i| Some(1990.0 + i as f64)).collect();
        let hoods: Vec<Option<String>> = (0..12)
            .map(|i| Some(if i % 2 == 0 { "NAmes" } else { "CollgCr" }.to_string()))
            .collect();
        let y: Vec<f64> = (0..12)
            .map(|i| 100_000.0 + 1_000.0 * i as f64 + if i % 2 == 0 { 0.0 } else { 20_000.0 })
            .collect();
        let table = Table::from_columns(vec![
            ("Year Built".to_string(), Column::Numeric(years)),
            ("Neighborhood".to_string(), Column::Text(hoods)),
        ])
        .unwrap();
        let (pipeline, x) = build_pipeline(&["Year Built".to_string()], &["Neighborhood".to_string()])
            .fit_transform(&table)
            .unwrap();
        let mut model = TrainedModel::Linear(LinearRegression::new(true));
        model.fit(&x, &y).unwrap();
        Predictor::new(pipeline, model)
    }

    #[test]
    fn test_predict_known_house() {
        let p = toy_predictor();
        let mut record = FeatureRecord::new();
        record.set("year_built", "1995").unwrap();
        record.set("neighborhood", "CollgCr").unwrap();
        let price = p.predict(&record).unwrap();
        assert!((price - 125_000.0).abs() < 1e-3, "got {}", price);
    }

    #[test]
    fn test_missing_and_unseen_values() {
        let p = toy_predictor();
        let empty = p.predict(&FeatureRecord::new()).unwrap();
        assert!(empty.is_finite());

        let mut record = FeatureRecord::new();
        record.set("neighborhood", "Somerst").unwrap();
        record.set("garage_cars", "2").unwrap();
        assert!(p.predict(&record).unwrap().is_finite());
    }

    #[test]
    fn test_numeric_input_matches_text_category_spelling() {
        // Garage Cars read as text in training, spelled with a decimal point.
        let cars: Vec<Option<String>> = (0..6)
            .map(|i| Some(if i % 2 == 0 { "1.0" } else { "2.0" }.to_string()))
            .collect();
        let y: Vec<f64> = (0..6).map(|i| if i % 2 == 0 { 100.0 } else { 200.0 }).collect();
        let table = Table::from_columns(vec![("Garage Cars".to_string(), Column::Text(cars))]).unwrap();
        let (pipeline, x) = build_pipeline(&[], &["Garage Cars".to_string()])
            .fit_transform(&table)
            .unwrap();
        let mut model = TrainedModel::Linear(LinearRegression::new(true));
        model.fit(&x, &y).unwrap();
        let p = Predictor::new(pipeline, model);

        let mut record = FeatureRecord::new();
        record.set("garage_cars", "2").unwrap();
        let table = p.to_table(&record).unwrap();
        assert_eq!(
            table.column("Garage Cars").unwrap().as_text().unwrap(),
            &[Some("2.0".to_string())]
        );
        assert!((p.predict(&record).unwrap() - 200.0).abs() < 1e-6);

        // No matching category: plain rendering, an unseen value.
        record.set("garage_cars", "3").unwrap();
        let table = p.to_table(&record).unwrap();
        assert_eq!(
            table.column("Garage Cars").unwrap().as_text().unwrap(),
            &[Some("3".to_string())]
        );
    }

    #[test]
    fn test_table_has_pipeline_columns_only() {
        let p = toy_predictor();
        let mut record = FeatureRecord::new();
        record.set("pool_qc", "Ex").unwrap();
        let table = p.to_table(&record).unwrap();
        assert_eq!(table.column_names(), ["Year Built", "Neighborhood"]);
        assert_eq!(table.n_rows(), 1);
    }
}
