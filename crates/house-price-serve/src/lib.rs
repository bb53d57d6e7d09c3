//! Online inference for the house price model: the input schema, value
//! coercion, the form reducer and the REST API.

pub mod api;
pub mod coerce;
pub mod error;
pub mod form;
pub mod predictor;
pub mod schema;

pub use api::{router, serve, PredictionResponse, SharedPredictor};
pub use coerce::{coerce, CoercionError, FeatureRecord, FeatureValue};
pub use error::{ServeError, ServeResult};
pub use form::{collect_features, reduce, FilterRow, FormAction, FormSession};
pub use predictor::Predictor;
pub use schema::{FieldKind, FieldSpec, HouseFeatures};
