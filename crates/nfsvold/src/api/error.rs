//! Mapping of failures onto the protocol's `Err` field.

use axum::Json;
use axum::response::{IntoResponse, Response};
use nfsvol::VolumeError;

use super::types::ErrResponse;

/// A failed plugin call.
///
/// Docker reads failures from the `Err` field of an otherwise normal
/// response, so every variant is answered with `{"Err": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    /// The volume core reported an error.
    Volume(VolumeError),
    /// The request body could not be understood.
    BadRequest(String),
}

impl From<VolumeError> for ApiError {
    fn from(err: VolumeError) -> Self {
        Self::Volume(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Volume(e) => write!(f, "{e}"),
            Self::BadRequest(message) => write!(f, "Invalid request: {message}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.to_string();
        tracing::warn!(error = %err, "Plugin call failed");
        Json(ErrResponse { err }).into_response()
    }
}
