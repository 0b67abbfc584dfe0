//! Volume name policies.

use crate::error::{VolumeError, VolumeResult};

/// How volume names are checked before they become path segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamePolicy {
    /// Names are used exactly as given, including `..` and `/`.
    #[default]
    Verbatim,
    /// Names must be a single, non-traversing path segment.
    Strict,
}

impl NamePolicy {
    /// Longest name accepted under [`NamePolicy::Strict`] (`NAME_MAX`).
    pub const MAX_LENGTH: usize = 255;

    /// Check `name` against this policy.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidName`] if the policy is strict and the
    /// name could escape or alias the mount root.
    pub fn check(self, name: &str) -> VolumeResult<()> {
        if self == Self::Verbatim {
            return Ok(());
        }

        let reason = if name.is_empty() {
            "name is empty"
        } else if name == "." || name == ".." {
            "name refers to a directory itself"
        } else if name.contains('/') {
            "name contains a path separator"
        } else if name.contains('\0') {
            "name contains a NUL byte"
        } else if name.len() > Self::MAX_LENGTH {
            "name is longer than 255 bytes"
        } else {
            return Ok(());
        };

        Err(VolumeError::InvalidName {
            name: name.to_string(),
            reason,
        })
    }
}
