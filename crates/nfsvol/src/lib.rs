//! # nfsvol
//!
//! Volume lifecycle core for a Docker volume plugin backed by one NFS share.
//!
//! Every volume is a directory under a single mounted export:
//! - [`MountRoot`] mounts and unmounts the share itself
//! - [`VolumeDirectory`] creates, removes, inspects and lists volumes
//! - [`MountFacility`] is the seam to the host's `mount`/`umount`

#![warn(missing_docs)]

pub mod config;
pub mod facility;
pub mod mount_root;
pub mod volume;

pub use config::ShareConfig;
pub use facility::{DryRunMount, MountFacility, MountRequest, SystemMount};
pub use mount_root::{MountRoot, MountState};
pub use nfsvol_common::{NamePolicy, VolumeError, VolumeResult};
pub use volume::{VolumeDirectory, VolumeEntry, VolumeInfo};
