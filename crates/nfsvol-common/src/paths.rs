//! Standard filesystem paths for the plugin.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

/// Directory under which NFS shares are mounted (default: /mnt/volumes).
pub static MOUNT_NAMESPACE: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("NFSVOL_MOUNT_NAMESPACE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/mnt/volumes"))
});

/// Unix socket Docker discovers the plugin on.
pub static PLUGIN_SOCKET: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("NFSVOL_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/docker/plugins/nfs.sock"))
});

/// Local mount point for `server:/export` under `namespace`.
///
/// The export is expected without leading or trailing slashes, see
/// [`clean_export_path`].
#[must_use]
pub fn share_mount_point(namespace: &Path, server: &str, export: &str) -> PathBuf {
    namespace.join(server).join(export)
}

/// Append `name` to `root` as a raw path segment.
///
/// Unlike [`Path::join`], an absolute-looking `name` does not replace `root`.
/// An empty `name` yields `root` itself.
#[must_use]
pub fn append_segment(root: &Path, name: &str) -> PathBuf {
    if name.is_empty() {
        return root.to_path_buf();
    }
    let mut path = root.as_os_str().to_owned();
    path.push("/");
    path.push(name);
    PathBuf::from(path)
}

/// Strip one leading and one trailing `/` from an export path.
#[must_use]
pub fn clean_export_path(export: &str) -> String {
    let export = export.strip_prefix('/').unwrap_or(export);
    let export = export.strip_suffix('/').unwrap_or(export);
    export.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_path() {
        assert_eq!(
            share_mount_point(Path::new("/mnt/volumes"), "nfs.example.com", "export/data"),
            PathBuf::from("/mnt/volumes/nfs.example.com/export/data")
        );
    }

    #[test]
    fn segment_is_appended_verbatim() {
        let root = Path::new("/mnt/volumes/srv/data");
        assert_eq!(append_segment(root, "alpha"), root.join("alpha"));
        assert_eq!(append_segment(root, ""), root);
        assert_eq!(
            append_segment(root, "/etc"),
            PathBuf::from("/mnt/volumes/srv/data//etc")
        );
        assert_eq!(
            append_segment(root, "../x"),
            PathBuf::from("/mnt/volumes/srv/data/../x")
        );
    }

    #[test]
    fn export_cleanup() {
        assert_eq!(clean_export_path("/export/data/"), "export/data");
        assert_eq!(clean_export_path("/export/data"), "export/data");
        assert_eq!(clean_export_path("export"), "export");
        assert_eq!(clean_export_path("/"), "");
        assert_eq!(clean_export_path(""), "");
    }
}
