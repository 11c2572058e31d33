//! Internal utility modules
//!
//! Shared functionality used by the transport and the orchestrator. Not part
//! of the public API.

pub mod fs_utils;
pub mod progress;
pub mod url_utils;
