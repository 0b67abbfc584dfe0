//! Host mount facility.
//!
//! The plugin never speaks NFS itself: it asks the host's `mount` and
//! `umount` binaries to do the work. [`MountFacility`] is the seam between
//! the mount root state machine and that host tooling.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;

/// Default bound on a single mount or umount invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A filesystem mount to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Filesystem type passed to `-t`.
    pub fstype: String,
    /// Options passed to `-o`, omitted when empty.
    pub options: String,
    /// Remote device, e.g. `server:/export`.
    pub device: String,
    /// Local mount point.
    pub target: PathBuf,
}

impl MountRequest {
    /// Arguments for the `mount` binary.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-t".into(), self.fstype.clone().into()];
        if !self.options.is_empty() {
            args.push("-o".into());
            args.push(self.options.clone().into());
        }
        args.push(self.device.clone().into());
        args.push(self.target.clone().into_os_string());
        args
    }
}

/// Output captured from a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Trimmed standard output.
    pub stdout: String,
    /// Trimmed standard error.
    pub stderr: String,
}

/// A failed or timed out command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    /// Exit code, `None` when the process never exited normally.
    pub code: Option<i32>,
    /// Human-readable reason.
    pub message: String,
}

/// Something that can mount and unmount filesystems.
#[async_trait]
pub trait MountFacility: Send + Sync {
    /// Mount `request.device` at `request.target`.
    async fn mount(&self, request: &MountRequest) -> Result<CommandOutput, CommandError>;

    /// Unmount whatever is mounted at `target`.
    async fn unmount(&self, target: &Path) -> Result<CommandOutput, CommandError>;
}

/// Runs the host `mount` and `umount` binaries.
#[derive(Debug, Clone)]
pub struct SystemMount {
    timeout: Duration,
}

impl SystemMount {
    /// Create a facility whose commands are killed after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemMount {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl MountFacility for SystemMount {
    async fn mount(&self, request: &MountRequest) -> Result<CommandOutput, CommandError> {
        run_command("mount", &request.args(), self.timeout).await
    }

    async fn unmount(&self, target: &Path) -> Result<CommandOutput, CommandError> {
        run_command("umount", &[target.as_os_str().to_owned()], self.timeout).await
    }
}

/// Run `program` to completion, killing it if it outlives `timeout`.
pub(crate) async fn run_command(
    program: &str,
    args: &[OsString],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    tracing::debug!(program, ?args, ?timeout, "Running command");

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(CommandError {
                code: None,
                message: format!("Failed to execute {program}: {e}"),
            });
        }
        Err(_) => {
            return Err(CommandError {
                code: None,
                message: format!("{program} timed out after {}s", timeout.as_secs_f32()),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        let message = if stderr.is_empty() {
            format!("{program} exited with {}", output.status)
        } else {
            stderr
        };
        return Err(CommandError {
            code: output.status.code(),
            message,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// A recorded call to a [`DryRunMount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountCall {
    /// A mount request.
    Mount(MountRequest),
    /// An unmount of the given target.
    Unmount(PathBuf),
}

/// Records requests instead of mounting anything.
///
/// Backs the daemon's `--dry-run` mode, where the share is expected to be
/// mounted by something else (or not at all).
#[derive(Debug, Default)]
pub struct DryRunMount {
    calls: Mutex<Vec<MountCall>>,
}

impl DryRunMount {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call seen so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<MountCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MountFacility for DryRunMount {
    async fn mount(&self, request: &MountRequest) -> Result<CommandOutput, CommandError> {
        tracing::info!(
            device = %request.device,
            target = %request.target.display(),
            "Dry run: skipping mount"
        );
        self.calls.lock().push(MountCall::Mount(request.clone()));
        Ok(CommandOutput::default())
    }

    async fn unmount(&self, target: &Path) -> Result<CommandOutput, CommandError> {
        tracing::info!(target = %target.display(), "Dry run: skipping umount");
        self.calls.lock().push(MountCall::Unmount(target.to_path_buf()));
        Ok(CommandOutput::default())
    }
}
