//! # nfsvol-common
//!
//! Shared types for the NFS volume plugin.
//!
//! This crate provides functionality used by both the volume core and the
//! plugin daemon:
//! - The error taxonomy reported back to Docker
//! - Standard mount and socket paths
//! - Volume name policies

#![warn(missing_docs)]

pub mod error;
pub mod name;
pub mod paths;

pub use error::{VolumeError, VolumeResult};
pub use name::NamePolicy;
