use crate::coerce::FeatureRecord;
use crate::error::{ServeError, ServeResult};
use crate::form::{collect_features, reduce, FormAction, FormSession};
use crate::predictor::Predictor;
use crate::schema::{FieldSpec, HouseFeatures};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub type SharedPredictor = Arc<Predictor>;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub predicted_price: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct FormRequest {
    #[serde(default)]
    pub session: FormSession,
    pub action: FormAction,
}

#[derive(Debug, Deserialize)]
pub struct FormPredictRequest {
    pub session: FormSession,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FormResponse {
    pub session: FormSession,
}

pub fn router(predictor: SharedPredictor) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/schema", get(handle_schema))
        .route("/predict", post(handle_predict))
        .route("/form", post(handle_form))
        .route("/form/predict", post(handle_form_predict))
        .layer(TraceLayer::new_for_http())
        .with_state(predictor)
}

/// Serve until ctrl-c.
pub async fn serve(listener: TcpListener, predictor: SharedPredictor) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(predictor))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ServeResult<T> {
    body.map(|Json(v)| v)
        .map_err(|rejection| ServeError::BadRequest(rejection.body_text()))
}

/// Tree ensembles are CPU-bound; keep them off the async workers.
async fn predict_blocking(predictor: SharedPredictor, record: FeatureRecord) -> ServeResult<f64> {
    tokio::task::spawn_blocking(move || predictor.predict(&record)).await?
}

async fn handle_health(State(predictor): State<SharedPredictor>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: predictor.model().kind(),
    })
}

async fn handle_schema() -> Json<&'static [FieldSpec]> {
    Json(HouseFeatures::FIELDS)
}

async fn handle_predict(
    State(predictor): State<SharedPredictor>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServeResult<Json<PredictionResponse>> {
    let object = match json_body(body)? {
        Value::Object(map) => map,
        _ => return Err(ServeError::BadRequest("expected a JSON object of features".into())),
    };
    let record = FeatureRecord::from_json(&object)?;
    let predicted_price = predict_blocking(predictor, record).await?;
    Ok(Json(PredictionResponse { predicted_price }))
}

async fn handle_form(body: Result<Json<FormRequest>, JsonRejection>) -> ServeResult<Json<FormResponse>> {
    let FormRequest { session, action } = json_body(body)?;
    Ok(Json(FormResponse {
        session: reduce(session, action),
    }))
}

async fn handle_form_predict(
    State(predictor): State<SharedPredictor>,
    body: Result<Json<FormPredictRequest>, JsonRejection>,
) -> ServeResult<Json<PredictionResponse>> {
    let FormPredictRequest { session } = json_body(body)?;
    let record = collect_features(&session)?;
    let predicted_price = predict_blocking(predictor, record).await?;
    Ok(Json(PredictionResponse { predicted_price }))
}
