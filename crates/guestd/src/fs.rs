//! Durable writes for the agent's state under the mount point.

use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use tempfile::Builder;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Replaces `path` with `contents` through a synced temporary sibling.
///
/// Missing parent directories are created first. Readers observe either the
/// previous file or the complete new one, never a partial write.
pub(crate) fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;
    let directory = if directory.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        directory
    };
    fs::create_dir_all(directory)?;

    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or("guestd"));
    #[cfg(unix)]
    {
        builder.permissions(fs::Permissions::from_mode(0o640));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
