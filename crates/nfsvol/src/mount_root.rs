//! The single NFS mount every volume lives under.
//!
//! A [`MountRoot`] is created once at startup, mounted when Docker activates
//! the plugin and unmounted when the daemon shuts down. Its local path is
//! known before it is mounted, since Docker may ask for volume paths first.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nfsvol_common::paths;
use nfsvol_common::{VolumeError, VolumeResult};
use parking_lot::Mutex;

use crate::config::ShareConfig;
use crate::facility::{CommandOutput, MountFacility, MountRequest, SystemMount};

/// Mount state of the share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Not mounted.
    Unmounted,
    /// `mount` is running.
    Mounting,
    /// Mounted and serving volumes.
    Mounted,
    /// `umount` is running.
    Unmounting,
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmounted => write!(f, "unmounted"),
            Self::Mounting => write!(f, "mounting"),
            Self::Mounted => write!(f, "mounted"),
            Self::Unmounting => write!(f, "unmounting"),
        }
    }
}

/// Owner of the share's local mount point.
pub struct MountRoot {
    config: ShareConfig,
    root: PathBuf,
    facility: Arc<dyn MountFacility>,
    state: Mutex<MountState>,
}

impl MountRoot {
    /// Create a mount root that mounts through the host's `mount` binary.
    #[must_use]
    pub fn new(config: ShareConfig) -> Self {
        let facility = Arc::new(SystemMount::new(config.timeout));
        Self::with_facility(config, facility)
    }

    /// Create a mount root backed by a custom facility.
    #[must_use]
    pub fn with_facility(config: ShareConfig, facility: Arc<dyn MountFacility>) -> Self {
        let root = paths::share_mount_point(&config.namespace, &config.server, &config.export);
        Self {
            config,
            root,
            facility,
            state: Mutex::new(MountState::Unmounted),
        }
    }

    /// Local mount point of the share. Valid whether or not it is mounted.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// The share configuration.
    #[must_use]
    pub const fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Current mount state.
    #[must_use]
    pub fn state(&self) -> MountState {
        *self.state.lock()
    }

    /// Whether the share is mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state() == MountState::Mounted
    }

    /// Mount the share at [`root_path`](Self::root_path).
    ///
    /// Activating an already mounted share logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// - [`VolumeError::Configuration`] if the server or export is missing;
    ///   no mount is attempted.
    /// - [`VolumeError::Busy`] if a mount or unmount is in progress.
    /// - [`VolumeError::Mount`] if the mount point cannot be created or the
    ///   mount command fails. The mount point is left in place.
    pub async fn activate(&self) -> VolumeResult<()> {
        self.config.validate()?;
        let Some(transition) = self.begin(MountState::Unmounted, MountState::Mounting)? else {
            tracing::warn!(root = %self.root.display(), "Share already mounted, ignoring activate");
            return Ok(());
        };

        let result = self.mount_share().await;
        transition.finish(if result.is_ok() {
            MountState::Mounted
        } else {
            MountState::Unmounted
        });
        result
    }

    /// Unmount the share and remove its mount point.
    ///
    /// Deactivating a share that is not mounted logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// - [`VolumeError::Busy`] if a mount or unmount is in progress.
    /// - [`VolumeError::Unmount`] if the umount command fails; the share is
    ///   still considered mounted and the mount point is kept.
    /// - [`VolumeError::MountPointCleanup`] if the share was unmounted but
    ///   the mount point directory could not be removed.
    pub async fn deactivate(&self) -> VolumeResult<()> {
        let Some(transition) = self.begin(MountState::Mounted, MountState::Unmounting)? else {
            tracing::warn!(root = %self.root.display(), "Share not mounted, ignoring deactivate");
            return Ok(());
        };

        tracing::info!(root = %self.root.display(), "Unmounting share");
        match self.facility.unmount(&self.root).await {
            Ok(output) => log_output("umount", &output),
            Err(e) => {
                transition.finish(MountState::Mounted);
                tracing::error!(
                    root = %self.root.display(),
                    code = ?e.code,
                    error = %e.message,
                    "Unmount failed"
                );
                return Err(VolumeError::Unmount {
                    code: e.code,
                    message: e.message,
                });
            }
        }
        transition.finish(MountState::Unmounted);

        tokio::fs::remove_dir(&self.root)
            .await
            .map_err(|source| VolumeError::MountPointCleanup {
                path: self.root.clone(),
                source,
            })?;

        tracing::info!(root = %self.root.display(), "Share unmounted");
        Ok(())
    }

    /// Move from `from` to `to`. Returns `None` if the share is already in
    /// the state the transition leads to once finished.
    ///
    /// If the returned transition is dropped unfinished, the state goes back
    /// to `from`.
    fn begin(&self, from: MountState, to: MountState) -> VolumeResult<Option<Transition<'_>>> {
        let mut state = self.state.lock();
        match *state {
            current if current == from => {
                *state = to;
                Ok(Some(Transition {
                    state: &self.state,
                    rollback: Some(from),
                }))
            }
            MountState::Mounting | MountState::Unmounting => Err(VolumeError::Busy {
                state: (*state).to_string(),
            }),
            _ => Ok(None),
        }
    }

    async fn mount_share(&self) -> VolumeResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| VolumeError::Mount {
                code: None,
                message: format!("Failed to create mount point {}: {e}", self.root.display()),
            })?;

        let request = MountRequest {
            fstype: "nfs".to_string(),
            options: self.config.mount_options.clone(),
            device: self.config.device(),
            target: self.root.clone(),
        };

        tracing::info!(
            device = %request.device,
            target = %request.target.display(),
            options = %request.options,
            "Mounting share"
        );

        match self.facility.mount(&request).await {
            Ok(output) => {
                log_output("mount", &output);
                tracing::info!(root = %self.root.display(), "Share mounted");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    device = %request.device,
                    code = ?e.code,
                    error = %e.message,
                    "Mount failed"
                );
                Err(VolumeError::Mount {
                    code: e.code,
                    message: e.message,
                })
            }
        }
    }
}

impl fmt::Debug for MountRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountRoot")
            .field("root", &self.root)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// An in-flight mount or unmount of the share.
struct Transition<'a> {
    state: &'a Mutex<MountState>,
    rollback: Option<MountState>,
}

impl Transition<'_> {
    fn finish(mut self, next: MountState) {
        self.rollback = None;
        *self.state.lock() = next;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.rollback {
            tracing::warn!(state = %previous, "Mount transition cancelled, restoring state");
            *self.state.lock() = previous;
        }
    }
}

fn log_output(program: &str, output: &CommandOutput) {
    if !output.stdout.is_empty() {
        tracing::info!(program, output = %output.stdout, "Command output");
    }
    if !output.stderr.is_empty() {
        tracing::warn!(program, output = %output.stderr, "Command reported warnings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{CommandError, DryRunMount, MountCall};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Fails every call with a fixed exit code.
    struct FailingMount {
        code: i32,
    }

    #[async_trait]
    impl MountFacility for FailingMount {
        async fn mount(&self, _request: &MountRequest) -> Result<CommandOutput, CommandError> {
            Err(CommandError {
                code: Some(self.code),
                message: "access denied by server".to_string(),
            })
        }

        async fn unmount(&self, _target: &Path) -> Result<CommandOutput, CommandError> {
            Err(CommandError {
                code: Some(self.code),
                message: "target is busy".to_string(),
            })
        }
    }

    /// Hangs on the next call after `stall()`, succeeds otherwise.
    #[derive(Default)]
    struct StallingMount {
        stall_next: AtomicBool,
    }

    impl StallingMount {
        fn stall(&self) {
            self.stall_next.store(true, Ordering::SeqCst);
        }

        async fn maybe_stall(&self) {
            if self.stall_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }

    #[async_trait]
    impl MountFacility for StallingMount {
        async fn mount(&self, _request: &MountRequest) -> Result<CommandOutput, CommandError> {
            self.maybe_stall().await;
            Ok(CommandOutput::default())
        }

        async fn unmount(&self, _target: &Path) -> Result<CommandOutput, CommandError> {
            self.maybe_stall().await;
            Ok(CommandOutput::default())
        }
    }

    fn config(namespace: &Path) -> ShareConfig {
        ShareConfig::new("nfs.example.com", "/export/data").with_namespace(namespace)
    }

    #[test]
    fn root_path_is_derived_from_share() {
        let root = MountRoot::new(config(Path::new("/mnt/volumes")));
        assert_eq!(
            root.root_path(),
            Path::new("/mnt/volumes/nfs.example.com/export/data")
        );
        assert_eq!(root.state(), MountState::Unmounted);
    }

    #[tokio::test]
    async fn activate_mounts_share() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(DryRunMount::new());
        let root = MountRoot::with_facility(config(temp.path()), facility.clone());

        root.activate().await.unwrap();

        assert!(root.is_mounted());
        assert!(root.root_path().is_dir());
        assert_eq!(
            facility.calls(),
            vec![MountCall::Mount(MountRequest {
                fstype: "nfs".to_string(),
                options: String::new(),
                device: "nfs.example.com:/export/data".to_string(),
                target: root.root_path().to_path_buf(),
            })]
        );
    }

    #[tokio::test]
    async fn second_activate_does_not_remount() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(DryRunMount::new());
        let root = MountRoot::with_facility(config(temp.path()), facility.clone());

        root.activate().await.unwrap();
        root.activate().await.unwrap();

        assert_eq!(facility.calls().len(), 1);
    }

    #[tokio::test]
    async fn activate_without_server_never_mounts() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(DryRunMount::new());
        let config = ShareConfig::new("", "/export/data").with_namespace(temp.path());
        let root = MountRoot::with_facility(config, facility.clone());

        let err = root.activate().await.unwrap_err();

        assert!(matches!(err, VolumeError::Configuration { .. }));
        assert!(facility.calls().is_empty());
        assert_eq!(root.state(), MountState::Unmounted);
    }

    #[tokio::test]
    async fn failed_mount_keeps_mount_point() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(FailingMount { code: 32 });
        let root = MountRoot::with_facility(config(temp.path()), facility);

        let err = root.activate().await.unwrap_err();

        assert!(matches!(err, VolumeError::Mount { code: Some(32), .. }));
        assert_eq!(
            err.to_string(),
            "mount command failed with code 32: access denied by server"
        );
        assert!(root.root_path().is_dir());
        assert_eq!(root.state(), MountState::Unmounted);
    }

    #[tokio::test]
    async fn deactivate_unmounts_and_removes_mount_point() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(DryRunMount::new());
        let root = MountRoot::with_facility(config(temp.path()), facility.clone());

        root.activate().await.unwrap();
        root.deactivate().await.unwrap();

        assert_eq!(root.state(), MountState::Unmounted);
        assert!(!root.root_path().exists());
        assert_eq!(
            facility.calls().last(),
            Some(&MountCall::Unmount(root.root_path().to_path_buf()))
        );
    }

    #[tokio::test]
    async fn deactivate_when_unmounted_is_a_no_op() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(DryRunMount::new());
        let root = MountRoot::with_facility(config(temp.path()), facility.clone());

        root.deactivate().await.unwrap();

        assert!(facility.calls().is_empty());
    }

    #[tokio::test]
    async fn leftover_files_fail_cleanup_not_unmount() {
        let temp = tempfile::tempdir().unwrap();
        let root = MountRoot::with_facility(config(temp.path()), Arc::new(DryRunMount::new()));

        root.activate().await.unwrap();
        // Nothing is really mounted, so this lands in the local directory.
        std::fs::create_dir(root.root_path().join("alpha")).unwrap();

        let err = root.deactivate().await.unwrap_err();

        assert!(matches!(err, VolumeError::MountPointCleanup { .. }));
        assert_eq!(root.state(), MountState::Unmounted);
        assert!(root.root_path().is_dir());
    }

    #[tokio::test]
    async fn failed_unmount_keeps_share_mounted() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(FailingMount { code: 16 });
        let root = MountRoot::with_facility(config(temp.path()), facility);
        std::fs::create_dir_all(root.root_path()).unwrap();
        *root.state.lock() = MountState::Mounted;

        let err = root.deactivate().await.unwrap_err();

        assert!(matches!(err, VolumeError::Unmount { code: Some(16), .. }));
        assert!(root.is_mounted());
        assert!(root.root_path().is_dir());
    }

    #[tokio::test]
    async fn transitions_in_progress_are_busy() {
        let temp = tempfile::tempdir().unwrap();
        let root = MountRoot::with_facility(config(temp.path()), Arc::new(DryRunMount::new()));
        *root.state.lock() = MountState::Mounting;

        assert!(matches!(
            root.activate().await.unwrap_err(),
            VolumeError::Busy { .. }
        ));
        assert!(matches!(
            root.deactivate().await.unwrap_err(),
            VolumeError::Busy { .. }
        ));
    }

    #[tokio::test]
    async fn cancelled_activate_can_be_retried() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(StallingMount::default());
        let root = MountRoot::with_facility(config(temp.path()), facility.clone());

        facility.stall();
        let cancelled = tokio::time::timeout(Duration::from_millis(50), root.activate()).await;
        assert!(cancelled.is_err());
        assert_eq!(root.state(), MountState::Unmounted);

        root.activate().await.unwrap();
        assert!(root.is_mounted());
    }

    #[tokio::test]
    async fn cancelled_deactivate_leaves_share_mounted() {
        let temp = tempfile::tempdir().unwrap();
        let facility = Arc::new(StallingMount::default());
        let root = MountRoot::with_facility(config(temp.path()), facility.clone());
        root.activate().await.unwrap();

        facility.stall();
        let cancelled = tokio::time::timeout(Duration::from_millis(50), root.deactivate()).await;
        assert!(cancelled.is_err());
        assert!(root.is_mounted());

        root.deactivate().await.unwrap();
        assert_eq!(root.state(), MountState::Unmounted);
        assert!(!root.root_path().exists());
    }
}
