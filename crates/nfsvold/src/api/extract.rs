//! Request body extraction.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// JSON body extractor that ignores the content type.
///
/// Docker posts `application/vnd.docker.plugins.v1+json`, and some calls
/// (`Plugin.Activate`, `VolumeDriver.List`) may arrive with no body at all,
/// which decodes to `T::default()`. So does a literal `null`.
#[derive(Debug)]
pub struct PluginJson<T>(pub T);

impl<S, T> FromRequest<S> for PluginJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if value.is_null() {
            return Ok(Self(T::default()));
        }

        serde_json::from_value(value)
            .map(Self)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}
