//! Artifact transport
//!
//! The core only needs two things from the network: stream one artifact to
//! disk, and fetch small side documents (log lists, SCT bundles). Both go
//! through the [`Transport`] trait so tests and alternative clients can stand
//! in for the HTTP implementation.
//!
//! ## Functions
//!
//! - **download**: stream a URL into a temporary file beside its destination,
//!   optionally checking an expected SHA-256 on the way
//! - **fetch**: GET a small document, `None` on 404

pub mod download;
pub mod http;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;

use crate::transparency::digest::Digest;

pub use download::write_artifact;
pub use http::HttpTransport;

/// Errors from the transport. Any of them aborts the run and leaves no
/// partial file behind.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sha256 mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: Digest, actual: Digest },

    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("download cancelled")]
    Cancelled,
}

/// Cooperative cancellation shared between the caller and the pipeline.
///
/// Cancelled once [`CancelToken::cancel`] is called on any clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One artifact download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    /// Final location. The body is staged in a temporary file in the same
    /// directory and only the caller moves it here.
    pub dest: &'a Path,
    /// First-line integrity check applied by the transport itself,
    /// independent of SCT verification.
    pub expected_sha256: Option<Digest>,
    pub cancel: &'a CancelToken,
}

/// A completed download, still staged in its temporary file.
///
/// Dropping it removes the file; [`Downloaded::persist`] moves it to the
/// destination.
#[derive(Debug)]
pub struct Downloaded {
    pub file: NamedTempFile,
    pub size: u64,
    /// Response headers, names lower-cased, in arrival order.
    pub headers: Vec<(String, String)>,
}

impl Downloaded {
    /// Path of the staged body.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Move the body to `dest`, replacing whatever is there.
    pub fn persist(self, dest: &Path) -> Result<PathBuf, TransportError> {
        self.file
            .persist(dest)
            .map_err(|e| TransportError::Io {
                path: dest.to_path_buf(),
                source: e.error,
            })?;
        Ok(dest.to_path_buf())
    }
}

/// Network capability the pipeline calls.
pub trait Transport {
    /// Stream `request.url` into a temporary file beside `request.dest`.
    ///
    /// The destination itself is never touched. On any error no temporary
    /// file is left behind.
    fn download(&self, request: &DownloadRequest<'_>) -> Result<Downloaded, TransportError>;

    /// Fetch a small document. Returns `Ok(None)` when the server answers 404.
    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn download(&self, request: &DownloadRequest<'_>) -> Result<Downloaded, TransportError> {
        (**self).download(request)
    }

    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).fetch(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_persist_replaces_destination() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("tool");
        std::fs::write(&dest, b"old").unwrap();

        let mut file = NamedTempFile::new_in(temp.path()).unwrap();
        std::io::Write::write_all(&mut file, b"new").unwrap();
        let staged = file.path().to_path_buf();
        let downloaded = Downloaded {
            file,
            size: 3,
            headers: Vec::new(),
        };

        assert_eq!(downloaded.persist(&dest).unwrap(), dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!staged.exists());
    }
}
