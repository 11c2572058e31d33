//! Streaming artifact writes
//!
//! Bytes land in a temporary file next to the destination. The file is handed
//! back still staged, so nothing reaches the destination until the caller has
//! finished checking it. A failed or cancelled download never leaves a partial
//! artifact behind: the temporary file is removed when it is dropped.

use std::io::{Read, Write};
use std::path::Path;

use super::{DownloadRequest, Downloaded, TransportError};
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::progress::{self, ProgressGuard, upgrade_to_bytes};
use crate::helpers::internal::url_utils;
use crate::transparency::digest::StreamingDigest;

/// Read buffer size for artifact bodies
const BUFFER_SIZE: usize = 64 * 1024;

/// Stage an artifact body in a temporary file beside `request.dest`.
///
/// The body has passed the optional checksum once this returns.
pub fn write_artifact(
    mut reader: impl Read,
    content_length: Option<u64>,
    headers: Vec<(String, String)>,
    request: &DownloadRequest<'_>,
) -> Result<Downloaded, TransportError> {
    let dest = request.dest;
    let io_err = |source| TransportError::Io {
        path: dest.to_path_buf(),
        source,
    };

    fs_utils::ensure_parent_dir(dest).map_err(io_err)?;
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut part = tempfile::Builder::new()
        .prefix(".btget-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(io_err)?;

    let filename = url_utils::extract_filename(request.url);
    let pb = progress::create_spinner(&format!("downloading {}", filename));
    let _guard = ProgressGuard::new(&pb);
    if let Some(len) = content_length {
        upgrade_to_bytes(&pb, len);
    }

    let mut checksum = request.expected_sha256.map(|_| StreamingDigest::new());
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        if request.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(TransportError::Request {
                    url: request.url.to_string(),
                    reason: format!("read error: {}", e),
                });
            }
        };

        part.write_all(&buffer[..n]).map_err(io_err)?;
        if let Some(c) = checksum.as_mut() {
            c.update(&buffer[..n]);
        }

        total_bytes += n as u64;
        pb.set_position(total_bytes);
    }

    part.as_file_mut().sync_all().map_err(io_err)?;

    if let (Some(expected), Some(c)) = (request.expected_sha256, checksum) {
        let actual = c.finish();
        if actual != expected {
            return Err(TransportError::ChecksumMismatch { expected, actual });
        }
    }

    Ok(Downloaded {
        file: part,
        size: total_bytes,
        headers,
    })
}
