//! CODEOWNERS discovery in a working tree.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use tracing::debug;

use crate::integration::domain::CodeOwners;

/// Locations searched, in the tracker's precedence order.
pub const CODEOWNERS_LOCATIONS: [&str; 3] = [".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

/// Loads the first CODEOWNERS file found under `workdir`.
///
/// Returns an empty rule set when none exists.
///
/// # Errors
///
/// Returns an I/O error when `workdir` cannot be opened or a CODEOWNERS file
/// exists but cannot be read.
pub fn discover(workdir: &Utf8Path) -> io::Result<CodeOwners> {
    let dir = Dir::open_ambient_dir(workdir, ambient_authority())?;
    for location in CODEOWNERS_LOCATIONS {
        match dir.read_to_string(location) {
            Ok(contents) => {
                debug!(path = location, "loaded CODEOWNERS");
                return Ok(CodeOwners::parse(&contents));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    Ok(CodeOwners::default())
}
