use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use nfsvol::{MountRoot, VolumeDirectory, VolumeError, VolumeResult};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::extract::PluginJson;
use super::types::{
    ActivateResponse, Capabilities, CapabilitiesResponse, CreateRequest, ErrResponse,
    GetResponse, ListResponse, ListedVolume, MountRequest, MountpointResponse, NameRequest,
    VolumeBody, VolumeStatus,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    root: Arc<MountRoot>,
    volumes: VolumeDirectory,
}

impl AppState {
    /// State serving the volumes under `root`.
    pub fn new(root: Arc<MountRoot>) -> Self {
        let volumes = VolumeDirectory::new(root.clone());
        Self { root, volumes }
    }
}

/// Router answering every plugin protocol call.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/VolumeDriver.Create", post(create))
        .route("/VolumeDriver.Remove", post(remove))
        .route("/VolumeDriver.Mount", post(mount))
        .route("/VolumeDriver.Unmount", post(unmount))
        .route("/VolumeDriver.Path", post(path))
        .route("/VolumeDriver.Get", post(get))
        .route("/VolumeDriver.List", post(list))
        .route("/VolumeDriver.Capabilities", post(capabilities))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn activate(State(state): State<AppState>) -> Result<Json<ActivateResponse>, ApiError> {
    tracing::info!("Activating NFS volume driver");
    state.root.activate().await?;
    Ok(Json(ActivateResponse::volume_driver()))
}

async fn create(
    State(state): State<AppState>,
    PluginJson(req): PluginJson<CreateRequest>,
) -> Result<Json<ErrResponse>, ApiError> {
    if let Some(opts) = req.opts.as_ref().filter(|o| !o.is_empty()) {
        tracing::debug!(volume = %req.name, ?opts, "Ignoring volume options");
    }
    let volumes = state.volumes.clone();
    blocking(move || volumes.create(&req.name)).await?;
    Ok(Json(ErrResponse::ok()))
}

async fn remove(
    State(state): State<AppState>,
    PluginJson(req): PluginJson<NameRequest>,
) -> Result<Json<ErrResponse>, ApiError> {
    let volumes = state.volumes.clone();
    blocking(move || volumes.remove(&req.name)).await?;
    Ok(Json(ErrResponse::ok()))
}

async fn mount(
    State(state): State<AppState>,
    PluginJson(req): PluginJson<MountRequest>,
) -> Result<Json<MountpointResponse>, ApiError> {
    tracing::info!(
        volume = %req.name,
        id = %req.id,
        "Mount requested, volume is already on the share"
    );
    let path = state.volumes.checked_path(&req.name)?;
    Ok(Json(mountpoint_response(&path)))
}

async fn unmount(PluginJson(req): PluginJson<MountRequest>) -> Json<ErrResponse> {
    tracing::info!(volume = %req.name, id = %req.id, "Unmount requested, nothing to do");
    Json(ErrResponse::ok())
}

async fn path(
    State(state): State<AppState>,
    PluginJson(req): PluginJson<NameRequest>,
) -> Result<Json<MountpointResponse>, ApiError> {
    tracing::debug!(volume = %req.name, "Path requested");
    let path = state.volumes.checked_path(&req.name)?;
    Ok(Json(mountpoint_response(&path)))
}

async fn get(
    State(state): State<AppState>,
    PluginJson(req): PluginJson<NameRequest>,
) -> Result<Json<GetResponse>, ApiError> {
    tracing::debug!(volume = %req.name, "Getting volume info");
    let volumes = state.volumes.clone();
    let info = blocking(move || volumes.get(&req.name)).await?;

    Ok(Json(GetResponse {
        volume: VolumeBody {
            name: info.name,
            mountpoint: info
                .mount_point
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            status: VolumeStatus {
                bytes_used: info.bytes_used,
            },
        },
        err: String::new(),
    }))
}

async fn list(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    tracing::debug!("Listing volumes");
    let volumes = state.volumes.clone();
    let entries = blocking(move || volumes.list()).await?;

    Ok(Json(ListResponse {
        volumes: entries
            .into_iter()
            .map(|v| ListedVolume {
                mountpoint: v.mount_point.to_string_lossy().into_owned(),
                name: v.name,
            })
            .collect(),
        err: String::new(),
    }))
}

async fn capabilities() -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        capabilities: Capabilities {
            scope: "global".to_string(),
        },
    })
}

fn mountpoint_response(path: &Path) -> MountpointResponse {
    MountpointResponse {
        mountpoint: path.to_string_lossy().into_owned(),
        err: String::new(),
    }
}

/// Run a filesystem call on the blocking pool.
async fn blocking<T, F>(f: F) -> VolumeResult<T>
where
    F: FnOnce() -> VolumeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VolumeError::Internal {
            message: format!("Volume task failed: {e}"),
        })?
}
