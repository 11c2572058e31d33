//! Known transparency logs
//!
//! The registry is the run's trust anchor set. It is loaded once from a
//! [`LogSource`] before anything is downloaded and is read-only afterwards,
//! so verification workers share it by reference.
//!
//! Both shapes of the Certificate Transparency log list are accepted:
//!
//! - v1: top-level `logs` array, operators referenced by `operated_by`
//! - v3: `operators[].logs[]` with an explicit `log_id` and a `state` object

use p256::pkcs8::der::Decode as _;
use p256::pkcs8::{DecodePublicKey as _, SubjectPublicKeyInfoRef};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::sct::LogId;
use crate::helpers::acquire::Transport;

/// Default log list location
pub const DEFAULT_LOG_LIST_URL: &str = "https://www.gstatic.com/ct/log_list/v3/log_list.json";

/// Errors that make the registry unusable. All of them are fatal for a run:
/// verification never proceeds without trust anchors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    #[error("cannot read log list {location}: {reason}")]
    Unreachable { location: String, reason: String },

    #[error("malformed log list: {0}")]
    Malformed(String),

    #[error("log '{description}' has an invalid key: {reason}")]
    InvalidKey { description: String, reason: String },

    #[error("log '{description}' declares log_id {declared} but its key hashes to {actual}")]
    LogIdMismatch {
        description: String,
        declared: String,
        actual: LogId,
    },

    #[error("log list contains no logs")]
    Empty,
}

/// Public key of a log, tagged with the signature scheme it implies.
#[derive(Clone)]
pub enum LogKey {
    EcdsaP256(p256::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
    /// Well-formed key of an algorithm we cannot verify (holds the OID).
    Unsupported(String),
}

impl LogKey {
    /// Parse a DER SubjectPublicKeyInfo.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, String> {
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::EcdsaP256(key));
        }
        if let Ok(key) = ed25519_dalek::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::Ed25519(key));
        }
        let spki = SubjectPublicKeyInfoRef::from_der(der)
            .map_err(|e| format!("not a DER SubjectPublicKeyInfo: {}", e))?;
        Ok(Self::Unsupported(spki.algorithm.oid.to_string()))
    }

    pub fn scheme(&self) -> &str {
        match self {
            Self::EcdsaP256(_) => "ecdsa-p256-sha256",
            Self::Ed25519(_) => "ed25519",
            Self::Unsupported(oid) => oid,
        }
    }
}

impl fmt::Debug for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogKey({})", self.scheme())
    }
}

/// Operational state of a log as published in the log list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Pending,
    Qualified,
    Usable,
    ReadOnly,
    Retired,
    Rejected,
    Disqualified,
}

impl LogStatus {
    /// SCTs from pending, rejected or disqualified logs carry no weight.
    pub fn is_trusted(self) -> bool {
        !matches!(self, Self::Pending | Self::Rejected | Self::Disqualified)
    }

    fn from_state_key(key: &str) -> Option<Self> {
        match key {
            "pending" => Some(Self::Pending),
            "qualified" => Some(Self::Qualified),
            "usable" => Some(Self::Usable),
            "readonly" => Some(Self::ReadOnly),
            "retired" => Some(Self::Retired),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Qualified => "qualified",
            Self::Usable => "usable",
            Self::ReadOnly => "readonly",
            Self::Retired => "retired",
            Self::Rejected => "rejected",
            Self::Disqualified => "disqualified",
        };
        f.write_str(s)
    }
}

/// One known transparency log.
#[derive(Debug, Clone)]
pub struct LogDescriptor {
    pub id: LogId,
    pub description: String,
    pub key: LogKey,
    pub url: Option<String>,
    pub operator: Option<String>,
    pub status: LogStatus,
}

/// Where the raw log list comes from.
pub trait LogSource {
    /// Human-readable location, used in messages.
    fn location(&self) -> String;

    fn read(&self, transport: &dyn Transport) -> Result<Vec<u8>, RegistryLoadError>;
}

/// Log list stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileLogSource(pub PathBuf);

impl LogSource for FileLogSource {
    fn location(&self) -> String {
        self.0.display().to_string()
    }

    fn read(&self, _transport: &dyn Transport) -> Result<Vec<u8>, RegistryLoadError> {
        std::fs::read(&self.0).map_err(|e| RegistryLoadError::Unreachable {
            location: self.location(),
            reason: e.to_string(),
        })
    }
}

/// Log list fetched over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpLogSource(pub String);

impl LogSource for HttpLogSource {
    fn location(&self) -> String {
        self.0.clone()
    }

    fn read(&self, transport: &dyn Transport) -> Result<Vec<u8>, RegistryLoadError> {
        match transport.fetch(&self.0) {
            Ok(Some(body)) => Ok(body),
            Ok(None) => Err(RegistryLoadError::Unreachable {
                location: self.location(),
                reason: "not found".to_string(),
            }),
            Err(e) => Err(RegistryLoadError::Unreachable {
                location: self.location(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Pick a source for a configured log list location (URL or path).
pub fn log_source_for(location: &str) -> Box<dyn LogSource> {
    let lower = location.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Box::new(HttpLogSource(location.to_string()))
    } else {
        Box::new(FileLogSource(PathBuf::from(location)))
    }
}

#[derive(Debug, Deserialize)]
struct LogListJson {
    #[serde(default)]
    logs: Vec<LogEntryJson>,
    #[serde(default)]
    operators: Vec<OperatorJson>,
}

#[derive(Debug, Deserialize)]
struct OperatorJson {
    #[serde(default)]
    id: Option<u64>,
    name: String,
    #[serde(default)]
    logs: Vec<LogEntryJson>,
}

#[derive(Debug, Deserialize)]
struct LogEntryJson {
    description: String,
    key: String,
    #[serde(default)]
    log_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    operated_by: Vec<u64>,
    #[serde(default)]
    disqualified_at: Option<u64>,
    #[serde(default)]
    state: Option<BTreeMap<String, serde_json::Value>>,
}

/// Log list layout an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFormat {
    /// Top-level `logs` array; entries carry no state.
    V1,
    /// Logs nested under `operators`, each with a `state` object.
    V3,
}

impl LogEntryJson {
    fn status(&self, format: ListFormat) -> LogStatus {
        if self.disqualified_at.is_some() {
            return LogStatus::Disqualified;
        }
        // v3 state objects have a single key naming the state
        match (&self.state, format) {
            (Some(state), _) => state
                .keys()
                .find_map(|k| LogStatus::from_state_key(k))
                .unwrap_or(LogStatus::Pending),
            (None, ListFormat::V1) => LogStatus::Usable,
            (None, ListFormat::V3) => LogStatus::Pending,
        }
    }
}

/// The set of logs trusted for this run.
#[derive(Debug, Clone, Default)]
pub struct LogRegistry {
    logs: Vec<LogDescriptor>,
    index: HashMap<LogId, usize>,
}

impl LogRegistry {
    /// Read and parse the log list from `source`.
    pub fn load(
        source: &dyn LogSource,
        transport: &dyn Transport,
    ) -> Result<Self, RegistryLoadError> {
        let raw = source.read(transport)?;
        Self::parse(&raw)
    }

    /// Parse a log list document.
    pub fn parse(raw: &[u8]) -> Result<Self, RegistryLoadError> {
        let list: LogListJson =
            serde_json::from_slice(raw).map_err(|e| RegistryLoadError::Malformed(e.to_string()))?;

        let operator_names: HashMap<u64, &str> = list
            .operators
            .iter()
            .filter_map(|op| op.id.map(|id| (id, op.name.as_str())))
            .collect();

        let mut registry = Self::default();

        for entry in &list.logs {
            let operator = entry
                .operated_by
                .iter()
                .find_map(|id| operator_names.get(id))
                .map(|name| name.to_string());
            registry.insert(descriptor_from_entry(entry, operator, ListFormat::V1)?);
        }

        for op in &list.operators {
            for entry in &op.logs {
                registry.insert(descriptor_from_entry(
                    entry,
                    Some(op.name.clone()),
                    ListFormat::V3,
                )?);
            }
        }

        if registry.logs.is_empty() {
            return Err(RegistryLoadError::Empty);
        }
        Ok(registry)
    }

    /// Build a registry from already-parsed descriptors.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = LogDescriptor>,
    ) -> Result<Self, RegistryLoadError> {
        let mut registry = Self::default();
        for d in descriptors {
            registry.insert(d);
        }
        if registry.logs.is_empty() {
            return Err(RegistryLoadError::Empty);
        }
        Ok(registry)
    }

    // First occurrence of an id wins.
    fn insert(&mut self, descriptor: LogDescriptor) {
        if self.index.contains_key(&descriptor.id) {
            return;
        }
        self.index.insert(descriptor.id, self.logs.len());
        self.logs.push(descriptor);
    }

    pub fn lookup(&self, id: &LogId) -> Option<&LogDescriptor> {
        self.index.get(id).map(|&i| &self.logs[i])
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogDescriptor> {
        self.logs.iter()
    }
}

fn descriptor_from_entry(
    entry: &LogEntryJson,
    operator: Option<String>,
    format: ListFormat,
) -> Result<LogDescriptor, RegistryLoadError> {
    let invalid_key = |reason: String| RegistryLoadError::InvalidKey {
        description: entry.description.clone(),
        reason,
    };

    let der = STANDARD
        .decode(entry.key.trim())
        .map_err(|e| invalid_key(format!("invalid base64: {}", e)))?;
    let key = LogKey::from_spki_der(&der).map_err(invalid_key)?;
    let id = LogId::from_spki_der(&der);

    if let Some(declared) = &entry.log_id
        && LogId::from_base64(declared) != Some(id)
    {
        return Err(RegistryLoadError::LogIdMismatch {
            description: entry.description.clone(),
            declared: declared.clone(),
            actual: id,
        });
    }

    Ok(LogDescriptor {
        id,
        description: entry.description.clone(),
        key,
        url: entry.url.clone(),
        operator,
        status: entry.status(format),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePublicKey as _;

    fn p256_key_b64(seed: u8) -> String {
        let sk = p256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap();
        let der = sk.verifying_key().to_public_key_der().unwrap();
        STANDARD.encode(der.as_bytes())
    }

    fn ed25519_key_b64(seed: u8) -> String {
        let sk = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
        let der = sk.verifying_key().to_public_key_der().unwrap();
        STANDARD.encode(der.as_bytes())
    }

    fn id_of(key_b64: &str) -> LogId {
        LogId::from_spki_der(&STANDARD.decode(key_b64).unwrap())
    }

    #[test]
    fn test_parse_v3_list() {
        let k1 = p256_key_b64(0x11);
        let k2 = ed25519_key_b64(0x22);
        let json = serde_json::json!({
            "version": "3.0",
            "operators": [{
                "name": "Example Operator",
                "email": ["ct@example.com"],
                "logs": [
                    {
                        "description": "Example 'Argon' log",
                        "log_id": id_of(&k1).to_base64(),
                        "key": k1,
                        "url": "https://ct.example.com/argon/",
                        "state": { "usable": { "timestamp": "2024-01-01T00:00:00Z" } }
                    },
                    {
                        "description": "Example 'Xenon' log",
                        "key": k2,
                        "url": "https://ct.example.com/xenon/",
                        "state": { "retired": { "timestamp": "2025-01-01T00:00:00Z" } }
                    }
                ]
            }]
        });

        let registry = LogRegistry::parse(json.to_string().as_bytes()).unwrap();
        assert_eq!(registry.len(), 2);

        let argon = registry.lookup(&id_of(&k1)).unwrap();
        assert_eq!(argon.description, "Example 'Argon' log");
        assert_eq!(argon.operator.as_deref(), Some("Example Operator"));
        assert_eq!(argon.status, LogStatus::Usable);
        assert!(matches!(argon.key, LogKey::EcdsaP256(_)));

        let xenon = registry.lookup(&id_of(&k2)).unwrap();
        assert_eq!(xenon.status, LogStatus::Retired);
        assert!(xenon.status.is_trusted());
        assert!(matches!(xenon.key, LogKey::Ed25519(_)));
    }

    #[test]
    fn test_parse_v1_list() {
        let k1 = p256_key_b64(0x33);
        let k2 = p256_key_b64(0x44);
        let json = serde_json::json!({
            "operators": [{ "id": 0, "name": "Google" }],
            "logs": [
                {
                    "description": "Google 'Pilot' log",
                    "key": k1,
                    "url": "ct.googleapis.com/pilot/",
                    "maximum_merge_delay": 86400,
                    "operated_by": [0]
                },
                {
                    "description": "Old log",
                    "key": k2,
                    "url": "ct.example.net/",
                    "operated_by": [7],
                    "disqualified_at": 1_500_000_000u64
                }
            ]
        });

        let registry = LogRegistry::parse(json.to_string().as_bytes()).unwrap();
        let pilot = registry.lookup(&id_of(&k1)).unwrap();
        assert_eq!(pilot.operator.as_deref(), Some("Google"));
        assert_eq!(pilot.status, LogStatus::Usable);

        let old = registry.lookup(&id_of(&k2)).unwrap();
        assert_eq!(old.operator, None);
        assert_eq!(old.status, LogStatus::Disqualified);
        assert!(!old.status.is_trusted());
    }

    #[test]
    fn test_v3_unknown_or_missing_state_untrusted() {
        let k1 = p256_key_b64(0x71);
        let k2 = p256_key_b64(0x72);
        let json = serde_json::json!({
            "operators": [{
                "name": "Example Operator",
                "logs": [
                    {
                        "description": "Frozen log",
                        "key": k1,
                        "state": { "frozen_by_policy": { "timestamp": "2026-01-01T00:00:00Z" } }
                    },
                    { "description": "Stateless log", "key": k2 }
                ]
            }]
        });

        let registry = LogRegistry::parse(json.to_string().as_bytes()).unwrap();
        for key in [&k1, &k2] {
            let log = registry.lookup(&id_of(key)).unwrap();
            assert_eq!(log.status, LogStatus::Pending);
            assert!(!log.status.is_trusted());
        }
    }

    #[test]
    fn test_lookup_unknown() {
        let json = serde_json::json!({
            "logs": [{ "description": "only", "key": p256_key_b64(0x55) }]
        });
        let registry = LogRegistry::parse(json.to_string().as_bytes()).unwrap();
        assert!(registry.lookup(&LogId::from_bytes([0; 32])).is_none());
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let k = p256_key_b64(0x66);
        let json = serde_json::json!({
            "logs": [
                { "description": "first", "key": k },
                { "description": "second", "key": k }
            ]
        });
        let registry = LogRegistry::parse(json.to_string().as_bytes()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(&id_of(&k)).unwrap().description, "first");
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = LogRegistry::parse(b"{ not json").unwrap_err();
        assert!(matches!(err, RegistryLoadError::Malformed(_)));
    }

    #[test]
    fn test_empty_list_rejected() {
        let err = LogRegistry::parse(br#"{"operators": []}"#).unwrap_err();
        assert!(matches!(err, RegistryLoadError::Empty));
    }

    #[test]
    fn test_bad_key_rejected() {
        let json = serde_json::json!({
            "logs": [{ "description": "broken", "key": "!!!" }]
        });
        let err = LogRegistry::parse(json.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("broken"));

        let json = serde_json::json!({
            "logs": [{ "description": "garbage", "key": STANDARD.encode(b"garbage") }]
        });
        let err = LogRegistry::parse(json.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, RegistryLoadError::InvalidKey { .. }));
    }

    #[test]
    fn test_log_id_mismatch_rejected() {
        let json = serde_json::json!({
            "operators": [{
                "name": "op",
                "logs": [{
                    "description": "liar",
                    "log_id": LogId::from_bytes([9; 32]).to_base64(),
                    "key": p256_key_b64(0x77)
                }]
            }]
        });
        let err = LogRegistry::parse(json.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, RegistryLoadError::LogIdMismatch { .. }));
    }

    #[test]
    fn test_file_source_missing() {
        struct NoTransport;
        impl Transport for NoTransport {
            fn download(
                &self,
                _: &crate::helpers::acquire::DownloadRequest<'_>,
            ) -> Result<crate::helpers::acquire::Downloaded, crate::helpers::acquire::TransportError>
            {
                unreachable!()
            }
            fn fetch(
                &self,
                _: &str,
            ) -> Result<Option<Vec<u8>>, crate::helpers::acquire::TransportError> {
                unreachable!()
            }
        }

        let source = FileLogSource(PathBuf::from("/nonexistent/log_list.json"));
        let err = LogRegistry::load(&source, &NoTransport).unwrap_err();
        assert!(matches!(err, RegistryLoadError::Unreachable { .. }));
    }

    #[test]
    fn test_log_source_for_scheme() {
        assert_eq!(
            log_source_for("https://example.com/list.json").location(),
            "https://example.com/list.json"
        );
        assert_eq!(log_source_for("/etc/btget/list.json").location(), "/etc/btget/list.json");
    }
}
