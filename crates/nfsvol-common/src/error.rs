//! Error types shared by the volume core and the plugin daemon.
//!
//! Every variant renders to a single human-readable line, which is what the
//! plugin protocol carries back to Docker in its `Err` field.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`VolumeError`].
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Errors raised by volume and mount root operations.
#[derive(Error, Diagnostic, Debug)]
pub enum VolumeError {
    /// The daemon is missing configuration required for the operation.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(nfsvol::config),
        help("Set NFS_SERVER and NFS_PATH (or --server and --export)")
    )]
    Configuration {
        /// What is missing or wrong.
        message: String,
    },

    /// The mount command failed or timed out.
    #[error("mount command failed with code {}: {message}", display_code(*code))]
    #[diagnostic(code(nfsvol::mount::failed))]
    Mount {
        /// Exit code of the mount command, if it exited at all.
        code: Option<i32>,
        /// Output or reason reported by the mount facility.
        message: String,
    },

    /// The umount command failed or timed out.
    #[error("umount command failed with code {}: {message}", display_code(*code))]
    #[diagnostic(code(nfsvol::unmount::failed))]
    Unmount {
        /// Exit code of the umount command, if it exited at all.
        code: Option<i32>,
        /// Output or reason reported by the unmount facility.
        message: String,
    },

    /// The share was unmounted but its mount point directory could not be removed.
    #[error("Failed to remove mount point {}: {source}", path.display())]
    #[diagnostic(code(nfsvol::unmount::cleanup))]
    MountPointCleanup {
        /// The mount point that was left behind.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A mount or unmount of the share is already in progress.
    #[error("Mount root is busy: {state}")]
    #[diagnostic(code(nfsvol::mount::busy), help("Retry once the transition finishes"))]
    Busy {
        /// The transition currently running.
        state: String,
    },

    /// Creating a volume directory failed.
    #[error("Failed to create volume '{name}': {source}")]
    #[diagnostic(code(nfsvol::volume::create))]
    Create {
        /// Volume name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing a volume directory failed.
    #[error("Failed to remove volume '{name}': {source}")]
    #[diagnostic(code(nfsvol::volume::remove))]
    Remove {
        /// Volume name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The mount root could not be enumerated.
    #[error("Failed to list volumes in {}: {source}", path.display())]
    #[diagnostic(
        code(nfsvol::volume::list),
        help("Check that the plugin has been activated and the share is mounted")
    )]
    List {
        /// The directory that was being listed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No volume exists under the given name.
    #[error("Volume not found: {name}")]
    #[diagnostic(code(nfsvol::volume::not_found))]
    NotFound {
        /// Volume name.
        name: String,
    },

    /// Inspecting a volume failed for a reason other than absence.
    #[error("Failed to stat volume '{name}': {source}")]
    #[diagnostic(code(nfsvol::volume::stat))]
    Stat {
        /// Volume name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Volume name rejected by strict name checking.
    #[error("Invalid volume name '{name}': {reason}")]
    #[diagnostic(
        code(nfsvol::volume::invalid_name),
        help("Volume names must be a single path segment without '/', '..' or NUL")
    )]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    #[diagnostic(code(nfsvol::internal))]
    Internal {
        /// The error message.
        message: String,
    },
}

fn display_code(code: Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}
