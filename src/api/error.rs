//! Error-to-response mapping for the HTTP surface.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else if status == StatusCode::FORBIDDEN {
            warn!("Request refused: {self}");
        }

        let body = json!({
            "ok": false,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
