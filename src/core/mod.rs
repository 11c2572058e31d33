//! Core infrastructure for a btget run
//!
//! Configuration, errors, terminal output and the download lifecycle that
//! ties the transport to the transparency checks.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod output;

pub use config::{Config, Overrides};
pub use error::{Error, Result};
pub use lifecycle::{DownloadOrchestrator, Report, Stage};
