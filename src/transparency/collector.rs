//! SCT collection
//!
//! Gathers the encoded SCTs that claim to cover an artifact from every
//! configured provenance source. Nothing here judges the SCTs: malformed
//! material is passed through so the verifier can count it as invalid, and
//! an artifact without any SCTs simply yields an empty set.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use super::digest::Digest;
use super::sct::decode_sct_list;
use crate::core::output;
use crate::helpers::acquire::{Transport, TransportError};
use crate::helpers::internal::url_utils;

/// Response header carrying a base64 `SignedCertificateTimestampList`
pub const SCT_HEADER: &str = "x-binary-transparency-sct";

/// Default suffix of the SCT sidecar published next to an artifact
pub const DEFAULT_SIDECAR_SUFFIX: &str = ".sct";

/// A downloaded artifact awaiting verification.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub url: String,
    /// Staged body; not yet at its final destination.
    pub path: PathBuf,
    pub size: u64,
    /// Response headers, names lower-cased.
    pub headers: Vec<(String, String)>,
}

impl Artifact {
    /// All values of a header, matched case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One SCT as found, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SctMaterial {
    pub encoded: Vec<u8>,
    /// Digest the provenance record says this SCT covers, if it says.
    pub claimed_digest: Option<Digest>,
    /// Where the SCT came from, for messages.
    pub origin: String,
}

/// JSON document listing SCTs for one artifact.
///
/// ```json
/// { "sha256": "<hex digest>", "scts": ["<base64 SCT>", "..."] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SctBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default)]
    pub scts: Vec<String>,
}

/// Failure of a single provenance source.
#[derive(Debug, thiserror::Error)]
pub enum ProvenanceError {
    #[error("cannot fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: TransportError,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed SCT bundle {location}: {reason}")]
    Malformed { location: String, reason: String },
}

/// Side channel that may carry SCTs for an artifact.
pub trait ProvenanceSource: Send + Sync {
    fn name(&self) -> String;

    fn collect(
        &self,
        artifact: &Artifact,
        transport: &dyn Transport,
    ) -> Result<Vec<SctMaterial>, ProvenanceError>;
}

/// SCT lists delivered in the artifact's response headers.
#[derive(Debug, Clone, Default)]
pub struct HeaderSource;

impl ProvenanceSource for HeaderSource {
    fn name(&self) -> String {
        format!("header {}", SCT_HEADER)
    }

    fn collect(
        &self,
        artifact: &Artifact,
        _transport: &dyn Transport,
    ) -> Result<Vec<SctMaterial>, ProvenanceError> {
        let mut materials = Vec::new();
        for value in artifact.header_values(SCT_HEADER) {
            let origin = self.name();
            let entries = STANDARD
                .decode(value.trim())
                .ok()
                .and_then(|list| decode_sct_list(&list).ok());

            match entries {
                Some(entries) => materials.extend(entries.into_iter().map(|encoded| SctMaterial {
                    encoded,
                    claimed_digest: None,
                    origin: origin.clone(),
                })),
                // Keep the raw value so it is counted as a malformed SCT
                None => materials.push(SctMaterial {
                    encoded: value.as_bytes().to_vec(),
                    claimed_digest: None,
                    origin,
                }),
            }
        }
        Ok(materials)
    }
}

/// [`SctBundle`] published at `<artifact url><suffix>`.
#[derive(Debug, Clone)]
pub struct SidecarSource {
    pub suffix: String,
}

impl Default for SidecarSource {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SIDECAR_SUFFIX.to_string(),
        }
    }
}

impl ProvenanceSource for SidecarSource {
    fn name(&self) -> String {
        format!("sidecar *{}", self.suffix)
    }

    fn collect(
        &self,
        artifact: &Artifact,
        transport: &dyn Transport,
    ) -> Result<Vec<SctMaterial>, ProvenanceError> {
        let location = url_utils::sidecar_url(&artifact.url, &self.suffix);
        match transport.fetch(&location) {
            Ok(Some(body)) => bundle_materials(&body, &location),
            Ok(None) => Ok(Vec::new()),
            Err(source) => Err(ProvenanceError::Fetch { location, source }),
        }
    }
}

/// [`SctBundle`] stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl ProvenanceSource for FileSource {
    fn name(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn collect(
        &self,
        _artifact: &Artifact,
        _transport: &dyn Transport,
    ) -> Result<Vec<SctMaterial>, ProvenanceError> {
        let body = std::fs::read(&self.path).map_err(|source| ProvenanceError::Io {
            path: self.path.clone(),
            source,
        })?;
        bundle_materials(&body, &self.path.display().to_string())
    }
}

/// Parse an [`SctBundle`] into materials.
pub fn bundle_materials(body: &[u8], location: &str) -> Result<Vec<SctMaterial>, ProvenanceError> {
    let malformed = |reason: String| ProvenanceError::Malformed {
        location: location.to_string(),
        reason,
    };

    let bundle: SctBundle = serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
    let claimed_digest = bundle
        .sha256
        .as_deref()
        .map(Digest::from_hex)
        .transpose()
        .map_err(|e| malformed(e.to_string()))?;

    Ok(bundle
        .scts
        .iter()
        .map(|sct| SctMaterial {
            // Undecodable entries stay in the set as malformed SCTs
            encoded: STANDARD
                .decode(sct.trim())
                .unwrap_or_else(|_| sct.as_bytes().to_vec()),
            claimed_digest,
            origin: location.to_string(),
        })
        .collect())
}

/// Runs every provenance source and merges what they find.
#[derive(Default)]
pub struct SctCollector {
    sources: Vec<Box<dyn ProvenanceSource>>,
}

impl SctCollector {
    pub fn new(sources: Vec<Box<dyn ProvenanceSource>>) -> Self {
        Self { sources }
    }

    pub fn with_source(mut self, source: impl ProvenanceSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn sources(&self) -> impl Iterator<Item = String> + '_ {
        self.sources.iter().map(|s| s.name())
    }

    /// Collect SCT material for `artifact`.
    ///
    /// A failing source is reported and skipped. Identical encodings are
    /// kept once, in first-seen order.
    pub fn collect(&self, artifact: &Artifact, transport: &dyn Transport) -> Vec<SctMaterial> {
        let mut seen = HashSet::new();
        let mut collected = Vec::new();

        for source in &self.sources {
            match source.collect(artifact, transport) {
                Ok(materials) => {
                    for material in materials {
                        if seen.insert(material.encoded.clone()) {
                            collected.push(material);
                        }
                    }
                }
                Err(e) => output::warning(&format!("{}: {}", source.name(), e)),
            }
        }

        collected
    }
}
