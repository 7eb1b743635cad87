//! Filesystem helpers for index teardown.

use std::fs;
use std::io::{ErrorKind, Result as IoResult};
use std::path::Path;
use tracing::debug;

/// Remove a file or an empty directory, retrying once after clearing the
/// read-only permission on it and on its parent directory.
///
/// A path that is already gone counts as removed.
///
/// # Errors
/// Returns the error from the retry if the path still cannot be removed.
pub fn force_remove(path: &Path) -> IoResult<()> {
    match remove_path(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => {
            debug!("Retrying removal of {} after {error}", path.display());
            make_writable(path)?;
            if let Some(parent) = path.parent() {
                make_writable(parent)?;
            }
            remove_path(path)
        }
    }
}

fn remove_path(path: &Path) -> IoResult<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_writable(path: &Path) -> IoResult<()> {
    use std::os::unix::fs::PermissionsExt as _;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o200);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> IoResult<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    #[allow(
        clippy::permissions_set_readonly_false,
        reason = "only reached on platforms without unix modes"
    )]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}
