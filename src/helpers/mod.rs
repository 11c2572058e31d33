//! Helper functions
//!
//! - **acquire**: the [`Transport`](acquire::Transport) seam, the HTTP
//!   transport and the staging artifact writer
//! - **internal**: filesystem, progress bar and URL utilities shared by the
//!   pipeline

pub mod acquire;
pub(crate) mod internal;
