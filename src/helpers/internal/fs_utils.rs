//! Common filesystem utilities
//!
//! Shared filesystem operations used by the transport and the orchestrator.

use std::io;
use std::path::Path;

/// Ensure a file's parent directory exists.
///
/// Creates the parent directory (and all ancestors) if it doesn't exist.
///
/// # Example
/// ```ignore
/// ensure_parent_dir(Path::new("/foo/bar/baz.txt"))?;
/// // /foo/bar/ now exists
/// ```
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
