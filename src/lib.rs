//! Binary-transparency-aware downloader
//!
//! `btget` fetches an artifact from a URL and keeps it only if its SHA-256
//! digest is attested by Signed Certificate Timestamps (SCTs) from known
//! transparency logs.
//!
//! # Pipeline
//!
//! ```text
//! LogRegistry::load -> Transport::download -> digest::compute_file
//!     -> SctCollector::collect -> verifier::verify_all -> policy::evaluate
//! ```
//!
//! [`DownloadOrchestrator`] runs the pipeline and enforces the verdict:
//!
//! | verdict | when                          | file      |
//! |---------|-------------------------------|-----------|
//! | OK      | every SCT valid               | saved     |
//! | Warning | some valid, some invalid      | saved     |
//! | Error   | no valid SCT (including none) | discarded |
//!
//! The body is staged beside the destination until the verdict, so a
//! rejected download never touches an existing file.
//!
//! # Where SCTs come from
//!
//! - the `X-Binary-Transparency-SCT` response header (base64 SCT list)
//! - a JSON sidecar at `<url>.sct`
//! - local bundle files passed with `--sct-file`
//!
//! # Example
//!
//! ```no_run
//! use btget::{CancelToken, Config, DownloadOrchestrator, HttpTransport};
//!
//! let config = Config::default();
//! let transport = HttpTransport::new(config.timeout);
//! let orchestrator = DownloadOrchestrator::new(config, transport);
//! match orchestrator.run("https://example.com/tool.tar.gz", &CancelToken::new()) {
//!     Ok(report) => println!("{}", report.verdict),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

pub mod core;
pub mod helpers;
pub mod transparency;

pub use crate::core::{Config, DownloadOrchestrator, Error, Overrides, Report, Stage, output};
pub use crate::helpers::acquire::{CancelToken, HttpTransport, Transport, TransportError};
pub use crate::transparency::{Digest, Level, LogRegistry, Verdict};
