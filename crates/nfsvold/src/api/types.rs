//! Docker volume plugin protocol messages.
//!
//! Field names follow the protocol exactly; every response that can fail
//! carries an `Err` string that is empty on success.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Body of `VolumeDriver.Create`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateRequest {
    /// Volume name.
    pub name: String,
    /// Driver options from `docker volume create -o`.
    pub opts: Option<HashMap<String, String>>,
}

/// Body of the calls that only name a volume (`Remove`, `Path`, `Get`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NameRequest {
    /// Volume name.
    pub name: String,
}

/// Body of `VolumeDriver.Mount` and `VolumeDriver.Unmount`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MountRequest {
    /// Volume name.
    pub name: String,
    /// Unique ID of the caller.
    #[serde(rename = "ID")]
    pub id: String,
}

/// Response carrying only an error string.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrResponse {
    /// Empty on success.
    #[serde(rename = "Err")]
    pub err: String,
}

impl ErrResponse {
    /// A successful response.
    #[must_use]
    pub const fn ok() -> Self {
        Self { err: String::new() }
    }
}

/// Response to `Plugin.Activate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    /// Plugin subsystems implemented.
    pub implements: Vec<String>,
}

impl ActivateResponse {
    /// Declares the volume driver subsystem.
    #[must_use]
    pub fn volume_driver() -> Self {
        Self {
            implements: vec!["VolumeDriver".to_string()],
        }
    }
}

/// Response to `VolumeDriver.Mount` and `VolumeDriver.Path`.
///
/// Docker spells the field `MountPoint` here, unlike Get and List.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountpointResponse {
    /// Host path of the volume.
    #[serde(rename = "MountPoint")]
    pub mountpoint: String,
    /// Empty on success.
    pub err: String,
}

/// Usage reported for a volume.
#[derive(Debug, Serialize)]
pub struct VolumeStatus {
    /// Shallow size of the volume directory entry.
    pub bytes_used: u64,
}

/// A volume as returned by `VolumeDriver.Get`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeBody {
    /// Volume name.
    pub name: String,
    /// Host path, empty if the entry is not a directory.
    pub mountpoint: String,
    /// Driver specific status.
    pub status: VolumeStatus,
}

/// Response to `VolumeDriver.Get`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    /// The volume.
    pub volume: VolumeBody,
    /// Empty on success.
    pub err: String,
}

/// A volume as returned by `VolumeDriver.List`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListedVolume {
    /// Volume name.
    pub name: String,
    /// Host path.
    pub mountpoint: String,
}

/// Response to `VolumeDriver.List`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    /// All volumes on the share.
    pub volumes: Vec<ListedVolume>,
    /// Empty on success.
    pub err: String,
}

/// Volume scope advertised to Docker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    /// `global`: every node sees the same volumes.
    pub scope: String,
}

/// Response to `VolumeDriver.Capabilities`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    /// The capabilities.
    pub capabilities: Capabilities,
}
