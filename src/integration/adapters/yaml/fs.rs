//! Capability-scoped file helpers shared by the YAML adapters.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};

/// Opens the parent directory of `path` and returns it with the file name.
pub(super) fn open_parent_dir(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path must include a file name"))?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Reads `path` to a string, returning `None` when it does not exist.
pub(super) fn read_optional(path: &Utf8Path) -> io::Result<Option<String>> {
    let (dir, file_name) = match open_parent_dir(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.read_to_string(file_name) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Opens (creating if needed) a lock file, leaving existing content intact.
pub(super) fn open_lock_file(path: &Utf8Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
}

/// Replaces `path` atomically with `contents`.
///
/// The content is written to a temporary `<name>.<random>.tmp` file in the
/// same directory, synced and renamed over the target, so readers observe
/// either the old or the new document and never a partial one.
pub(super) fn write_atomic(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    std::fs::create_dir_all(parent)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path must include a file name"))?;
    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{file_name}."))
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
