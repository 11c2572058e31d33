//! Pipeline error types.

use thiserror::Error;

use super::lifecycle::Report;
use crate::helpers::acquire::TransportError;
use crate::transparency::RegistryLoadError;

/// Errors that end a run.
///
/// Per-SCT problems never show up here; they are recorded as invalid
/// outcomes and only surface through the verdict.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot load transparency logs: {0}")]
    RegistryLoad(#[from] RegistryLoadError),

    #[error("download failed: {0}")]
    Transport(#[from] TransportError),

    #[error("artifact rejected: {}", .0.verdict.message)]
    Rejected(Box<Report>),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// The report of a rejected artifact.
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Rejected(report) => Some(report),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
