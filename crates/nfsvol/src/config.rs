//! Share configuration.

use std::path::PathBuf;
use std::time::Duration;

use nfsvol_common::paths::{self, MOUNT_NAMESPACE};
use nfsvol_common::{NamePolicy, VolumeError, VolumeResult};

use crate::facility::DEFAULT_TIMEOUT;

/// Where the share lives and how to mount it.
///
/// `server` and `export` may be empty at startup; the share can only be
/// activated once both are set.
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// NFS server host or address.
    pub server: String,
    /// Export path on the server, without leading or trailing `/`.
    pub export: String,
    /// Options passed verbatim to `mount -o`.
    pub mount_options: String,
    /// Local directory shares are mounted under.
    pub namespace: PathBuf,
    /// Bound on each mount and umount call.
    pub timeout: Duration,
    /// Volume name checking.
    pub name_policy: NamePolicy,
}

impl ShareConfig {
    /// Create a config for `server:/export` with default settings.
    ///
    /// The export is cleaned of a leading and trailing `/`.
    #[must_use]
    pub fn new(server: impl Into<String>, export: &str) -> Self {
        Self {
            server: server.into(),
            export: paths::clean_export_path(export),
            mount_options: String::new(),
            namespace: MOUNT_NAMESPACE.clone(),
            timeout: DEFAULT_TIMEOUT,
            name_policy: NamePolicy::default(),
        }
    }

    /// Set the mount options.
    #[must_use]
    pub fn with_mount_options(mut self, options: impl Into<String>) -> Self {
        self.mount_options = options.into();
        self
    }

    /// Set the local mount namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<PathBuf>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the mount and umount timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the volume name policy.
    #[must_use]
    pub const fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    /// The `server:/export` device string handed to `mount`.
    #[must_use]
    pub fn device(&self) -> String {
        format!("{}:/{}", self.server, self.export)
    }

    /// Check the share can be mounted.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Configuration`] if the server or export is missing.
    pub fn validate(&self) -> VolumeResult<()> {
        if self.server.is_empty() {
            return Err(VolumeError::Configuration {
                message: "NFS_SERVER is required".to_string(),
            });
        }
        if self.export.is_empty() {
            return Err(VolumeError::Configuration {
                message: "NFS_PATH is required".to_string(),
            });
        }
        Ok(())
    }
}
