//! Binary transparency verification
//!
//! The pieces that turn a downloaded file into a [`Verdict`]:
//!
//! 1. [`digest`] hashes the artifact
//! 2. [`collector`] finds the SCTs that claim to cover it
//! 3. [`verifier`] checks each SCT against the [`registry`] of known logs
//! 4. [`policy`] reduces the outcomes to one verdict

pub mod collector;
pub mod digest;
pub mod policy;
pub mod registry;
pub mod sct;
pub mod verifier;

pub use collector::{
    Artifact, FileSource, HeaderSource, ProvenanceSource, SctBundle, SctCollector, SctMaterial,
    SidecarSource,
};
pub use digest::Digest;
pub use policy::{Level, Verdict};
pub use registry::{LogDescriptor, LogKey, LogRegistry, LogSource, LogStatus, RegistryLoadError};
pub use sct::{EncodeError, LogId, Sct};
pub use verifier::{VerificationFailure, VerificationOutcome};
