//! SCT signature verification
//!
//! Each SCT is checked on its own against the artifact digest and the log
//! registry. Checks are pure, so [`verify_all`] spreads them across worker
//! threads while keeping results in input order.

use ed25519_dalek::Verifier as _;
use std::thread;

use super::collector::SctMaterial;
use super::digest::Digest;
use super::registry::{LogDescriptor, LogKey, LogRegistry, LogStatus};
use super::sct::{
    DecodeError, EncodeError, HASH_INTRINSIC, HASH_SHA256, LogId, SCT_VERSION_V1, SIG_ECDSA, SIG_ED25519, Sct,
};
use crate::helpers::acquire::CancelToken;

/// The log an SCT was attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRef {
    pub id: LogId,
    pub description: String,
}

impl From<&LogDescriptor> for LogRef {
    fn from(d: &LogDescriptor) -> Self {
        Self {
            id: d.id,
            description: d.description.clone(),
        }
    }
}

/// Why an SCT does not count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("malformed SCT: {0}")]
    Malformed(#[from] DecodeError),

    #[error("cannot rebuild signed data: {0}")]
    Unencodable(#[from] EncodeError),

    #[error("unsupported SCT version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown log {0}")]
    UnknownLog(LogId),

    #[error("log is {0}")]
    UntrustedLog(LogStatus),

    #[error("SCT covers {claimed}, artifact is {actual}")]
    DigestMismatch { claimed: Digest, actual: Digest },

    #[error("SCT uses hash {hash}/signature {signature}, log key requires {expected}")]
    SchemeMismatch {
        hash: u8,
        signature: u8,
        expected: String,
    },

    #[error("unsupported log key algorithm {0}")]
    UnsupportedKey(String),

    #[error("signature does not verify")]
    BadSignature,
}

/// Result of checking one SCT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Valid {
        log: LogRef,
    },
    Invalid {
        /// Present when the SCT named a log the registry knows.
        log: Option<LogRef>,
        reason: VerificationFailure,
    },
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn log(&self) -> Option<&LogRef> {
        match self {
            Self::Valid { log } => Some(log),
            Self::Invalid { log, .. } => log.as_ref(),
        }
    }
}

/// Verification was cancelled before every SCT was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("verification cancelled")]
pub struct Cancelled;

/// Check one SCT against `digest` and the registry.
pub fn verify(material: &SctMaterial, digest: &Digest, registry: &LogRegistry) -> VerificationOutcome {
    let invalid = |log: Option<LogRef>, reason| VerificationOutcome::Invalid { log, reason };

    let sct = match Sct::decode(&material.encoded) {
        Ok(sct) => sct,
        Err(e) => return invalid(None, e.into()),
    };
    if sct.version != SCT_VERSION_V1 {
        return invalid(None, VerificationFailure::UnsupportedVersion(sct.version));
    }

    let Some(descriptor) = registry.lookup(&sct.log_id) else {
        return invalid(None, VerificationFailure::UnknownLog(sct.log_id));
    };
    let log = LogRef::from(descriptor);

    match check(&sct, material.claimed_digest, digest, descriptor) {
        Ok(()) => VerificationOutcome::Valid { log },
        Err(reason) => invalid(Some(log), reason),
    }
}

fn check(
    sct: &Sct,
    claimed: Option<Digest>,
    actual: &Digest,
    log: &LogDescriptor,
) -> Result<(), VerificationFailure> {
    if !log.status.is_trusted() {
        return Err(VerificationFailure::UntrustedLog(log.status));
    }
    if let Some(claimed) = claimed
        && claimed != *actual
    {
        return Err(VerificationFailure::DigestMismatch {
            claimed,
            actual: *actual,
        });
    }

    let scheme_mismatch = || VerificationFailure::SchemeMismatch {
        hash: sct.hash_algorithm,
        signature: sct.signature_algorithm,
        expected: log.key.scheme().to_string(),
    };
    let payload = sct.signed_payload(actual)?;

    match &log.key {
        LogKey::EcdsaP256(key) => {
            if (sct.hash_algorithm, sct.signature_algorithm) != (HASH_SHA256, SIG_ECDSA) {
                return Err(scheme_mismatch());
            }
            let signature = p256::ecdsa::Signature::from_der(&sct.signature)
                .map_err(|_| VerificationFailure::BadSignature)?;
            key.verify(&payload, &signature)
                .map_err(|_| VerificationFailure::BadSignature)
        }
        LogKey::Ed25519(key) => {
            if (sct.hash_algorithm, sct.signature_algorithm) != (HASH_INTRINSIC, SIG_ED25519) {
                return Err(scheme_mismatch());
            }
            let signature = ed25519_dalek::Signature::from_slice(&sct.signature)
                .map_err(|_| VerificationFailure::BadSignature)?;
            key.verify(&payload, &signature)
                .map_err(|_| VerificationFailure::BadSignature)
        }
        LogKey::Unsupported(oid) => Err(VerificationFailure::UnsupportedKey(oid.clone())),
    }
}

/// Verify every SCT, using up to `workers` threads.
///
/// Outcomes come back in the order of `materials`. Returns [`Cancelled`]
/// if `cancel` fires before all checks finish.
pub fn verify_all(
    materials: &[SctMaterial],
    digest: &Digest,
    registry: &LogRegistry,
    workers: usize,
    cancel: &CancelToken,
) -> Result<Vec<VerificationOutcome>, Cancelled> {
    if materials.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, materials.len());
    let chunk_size = materials.len().div_ceil(workers);

    let verify_chunk = |chunk: &[SctMaterial]| -> Result<Vec<VerificationOutcome>, Cancelled> {
        chunk
            .iter()
            .map(|m| {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                Ok(verify(m, digest, registry))
            })
            .collect()
    };

    if workers == 1 {
        return verify_chunk(materials);
    }

    thread::scope(|s| {
        let handles: Vec<_> = materials
            .chunks(chunk_size)
            .map(|chunk| s.spawn(move || verify_chunk(chunk)))
            .collect();

        let mut outcomes = Vec::with_capacity(materials.len());
        for handle in handles {
            // A panicking worker leaves its SCTs unchecked; treat as cancelled
            let chunk = handle.join().map_err(|_| Cancelled)??;
            outcomes.extend(chunk);
        }
        Ok(outcomes)
    })
}
