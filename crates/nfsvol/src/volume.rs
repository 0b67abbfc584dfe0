//! Volumes as directories under the mount root.
//!
//! A volume has no state of its own: it exists exactly when a directory of
//! that name exists under the share. Nothing here locks; concurrent calls on
//! the same name race at the filesystem, which Docker avoids by serializing
//! lifecycle calls per volume.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use nfsvol_common::paths;
use nfsvol_common::{NamePolicy, VolumeError, VolumeResult};

use crate::mount_root::MountRoot;

/// Status of a single volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Volume name.
    pub name: String,
    /// Path of the volume, `None` if the entry exists but is not a directory.
    pub mount_point: Option<PathBuf>,
    /// Size reported by a shallow stat of the entry (not a recursive usage).
    pub bytes_used: u64,
}

/// A volume found by [`VolumeDirectory::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeEntry {
    /// Volume name.
    pub name: String,
    /// Path of the volume.
    pub mount_point: PathBuf,
}

/// Create, remove, inspect and list volumes under a [`MountRoot`].
#[derive(Debug, Clone)]
pub struct VolumeDirectory {
    root: Arc<MountRoot>,
    policy: NamePolicy,
}

impl VolumeDirectory {
    /// Create a directory of volumes under `root`, using the root's name policy.
    #[must_use]
    pub fn new(root: Arc<MountRoot>) -> Self {
        let policy = root.config().name_policy;
        Self { root, policy }
    }

    /// The mount root volumes live under.
    #[must_use]
    pub const fn mount_root(&self) -> &Arc<MountRoot> {
        &self.root
    }

    /// Path of volume `name`. An empty name resolves to the root itself.
    ///
    /// The name is appended as-is, without any checks.
    #[must_use]
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        paths::append_segment(self.root.root_path(), name)
    }

    /// Path of volume `name` after checking it against the name policy.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidName`] if the policy rejects the name.
    pub fn checked_path(&self, name: &str) -> VolumeResult<PathBuf> {
        self.policy.check(name)?;
        Ok(self.resolve_path(name))
    }

    /// Create volume `name`, including missing parent directories.
    ///
    /// Creating an existing volume succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Create`] if the directory cannot be created,
    /// for example because a file of that name is in the way.
    pub fn create(&self, name: &str) -> VolumeResult<PathBuf> {
        let path = self.checked_path(name)?;
        tracing::info!(volume = %name, path = %path.display(), "Creating volume");

        fs::create_dir_all(&path).map_err(|source| {
            tracing::error!(volume = %name, error = %source, "Failed to create volume");
            VolumeError::Create {
                name: name.to_string(),
                source,
            }
        })?;

        Ok(path)
    }

    /// Remove volume `name` and everything in it.
    ///
    /// Removing a volume that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Remove`] on any other filesystem error.
    pub fn remove(&self, name: &str) -> VolumeResult<()> {
        let path = self.checked_path(name)?;
        tracing::info!(volume = %name, path = %path.display(), "Removing volume");

        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(volume = %name, "Volume already gone");
                Ok(())
            }
            Err(source) => {
                tracing::error!(volume = %name, error = %source, "Failed to remove volume");
                Err(VolumeError::Remove {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Inspect volume `name` with a shallow stat.
    ///
    /// # Errors
    ///
    /// - [`VolumeError::NotFound`] if nothing exists under that name.
    /// - [`VolumeError::Stat`] if the entry cannot be inspected.
    pub fn get(&self, name: &str) -> VolumeResult<VolumeInfo> {
        let path = self.checked_path(name)?;

        let metadata = fs::metadata(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                VolumeError::NotFound {
                    name: name.to_string(),
                }
            } else {
                VolumeError::Stat {
                    name: name.to_string(),
                    source,
                }
            }
        })?;

        Ok(VolumeInfo {
            name: name.to_string(),
            mount_point: metadata.is_dir().then_some(path),
            bytes_used: metadata.len(),
        })
    }

    /// List every directory directly under the mount root.
    ///
    /// Entries come back in the order the filesystem yields them.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::List`] if the root cannot be read, typically
    /// because the share is not mounted.
    pub fn list(&self) -> VolumeResult<Vec<VolumeEntry>> {
        let root = self.root.root_path();
        let list_error = |source| VolumeError::List {
            path: root.to_path_buf(),
            source,
        };

        let mut volumes = Vec::new();
        for entry in fs::read_dir(root).map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            if !entry.file_type().map_err(list_error)?.is_dir() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(
                    path = %entry.path().display(),
                    "Skipping volume with non UTF-8 name"
                );
                continue;
            };
            if name == "." || name == ".." {
                continue;
            }

            volumes.push(VolumeEntry {
                mount_point: self.resolve_path(&name),
                name,
            });
        }

        tracing::debug!(count = volumes.len(), "Listed volumes");
        Ok(volumes)
    }
}
