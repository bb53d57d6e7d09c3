use crate::coerce::CoercionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use house_price_core::MlError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("prediction failed: {0}")]
    Model(#[from] MlError),

    #[error("prediction task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::Coercion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServeError::Model(_) | ServeError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServeError::Coercion(e) => json!({ "error": e.to_string(), "field": e.field() }),
            ServeError::BadRequest(msg) => json!({ "error": msg }),
            ServeError::Model(_) | ServeError::Worker(_) => {
                tracing::error!(detail = %self, "prediction failed");
                json!({ "error": "internal error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ServeResult<T> = Result<T, ServeError>;
