//! Signed Certificate Timestamp encoding
//!
//! SCTs use the RFC 6962 wire format (TLS presentation language, big-endian):
//!
//! ```text
//! struct {
//!     Version sct_version;                 // u8, v1 = 0
//!     LogID id;                            // 32 bytes, SHA-256 of the log's SPKI
//!     uint64 timestamp;                    // ms since the epoch
//!     CtExtensions extensions;             // opaque<0..2^16-1>
//!     digitally-signed struct { ... };     // u8 hash, u8 sig, opaque<0..2^16-1>
//! } SignedCertificateTimestamp;
//! ```
//!
//! For binary transparency the signed struct covers the artifact digest
//! instead of a certificate; see [`signed_payload`].

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest as _, Sha256};
use std::fmt;

use super::digest::Digest;

/// SCT version 1
pub const SCT_VERSION_V1: u8 = 0;

/// `certificate_timestamp` signature type
pub const SIGNATURE_TYPE_TIMESTAMP: u8 = 0;

/// Entry type for an artifact SHA-256 digest. Lives in the private-use range
/// so it can never collide with an X.509 or precert entry.
pub const ENTRY_TYPE_ARTIFACT_SHA256: u16 = 0x8001;

/// TLS HashAlgorithm / SignatureAlgorithm code points.
pub const HASH_SHA256: u8 = 4;
pub const HASH_INTRINSIC: u8 = 8;
pub const SIG_ECDSA: u8 = 3;
pub const SIG_ED25519: u8 = 7;

/// Length of a log identifier
pub const LOG_ID_LEN: usize = 32;

/// Identity of a transparency log: SHA-256 of its DER SubjectPublicKeyInfo.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogId([u8; LOG_ID_LEN]);

impl LogId {
    pub const fn from_bytes(bytes: [u8; LOG_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a log id from the log's DER-encoded public key.
    pub fn from_spki_der(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    pub fn as_bytes(&self) -> &[u8; LOG_ID_LEN] {
        &self.0
    }

    /// Parse the base64 form used in log lists.
    pub fn from_base64(s: &str) -> Option<Self> {
        let bytes = STANDARD.decode(s.trim()).ok()?;
        bytes.try_into().ok().map(Self)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogId({})", self.to_base64())
    }
}

/// Decoded Signed Certificate Timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sct {
    pub version: u8,
    pub log_id: LogId,
    pub timestamp: u64,
    pub extensions: Vec<u8>,
    pub hash_algorithm: u8,
    pub signature_algorithm: u8,
    pub signature: Vec<u8>,
}

/// Why a byte sequence is not a well-formed SCT.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
    #[error("empty SCT list")]
    EmptyList,
}

/// A field too long for its TLS length prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} is {len} bytes, at most 65535 fit")]
pub struct EncodeError {
    pub field: &'static str,
    pub len: usize,
}

impl Sct {
    /// Decode one serialized SCT. The whole input must be consumed.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let version = r.u8("version")?;
        let log_id = LogId(r.array("log id")?);
        let timestamp = r.u64("timestamp")?;
        let extensions = r.opaque16("extensions")?.to_vec();
        let hash_algorithm = r.u8("hash algorithm")?;
        let signature_algorithm = r.u8("signature algorithm")?;
        let signature = r.opaque16("signature")?.to_vec();
        r.finish()?;

        Ok(Self {
            version,
            log_id,
            timestamp,
            extensions,
            hash_algorithm,
            signature_algorithm,
            signature,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(47 + self.extensions.len() + self.signature.len());
        out.push(self.version);
        out.extend_from_slice(self.log_id.as_bytes());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        put_opaque16(&mut out, &self.extensions, "extensions")?;
        out.push(self.hash_algorithm);
        out.push(self.signature_algorithm);
        put_opaque16(&mut out, &self.signature, "signature")?;
        Ok(out)
    }

    /// The bytes the issuing log signed for this SCT over `digest`.
    pub fn signed_payload(&self, digest: &Digest) -> Result<Vec<u8>, EncodeError> {
        signed_payload(self.version, self.timestamp, digest, &self.log_id, &self.extensions)
    }
}

/// Rebuild the payload a log signs when it accepts an artifact digest.
///
/// ```text
/// u8 sct_version | u8 signature_type | u64 timestamp | u16 entry_type |
/// opaque digest<1..2^16-1> | LogID id | opaque extensions<0..2^16-1>
/// ```
pub fn signed_payload(
    version: u8,
    timestamp: u64,
    digest: &Digest,
    log_id: &LogId,
    extensions: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(80 + extensions.len());
    out.push(version);
    out.push(SIGNATURE_TYPE_TIMESTAMP);
    out.extend_from_slice(&timestamp.to_be_bytes());
    out.extend_from_slice(&ENTRY_TYPE_ARTIFACT_SHA256.to_be_bytes());
    put_opaque16(&mut out, digest.as_bytes(), "digest")?;
    out.extend_from_slice(log_id.as_bytes());
    put_opaque16(&mut out, extensions, "extensions")?;
    Ok(out)
}

/// Split a `SignedCertificateTimestampList` into its serialized SCTs.
///
/// Entries are returned undecoded so one malformed SCT does not hide the
/// others from verification.
pub fn decode_sct_list(bytes: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut outer = Reader::new(bytes);
    let list = outer.opaque16("SCT list")?;
    outer.finish()?;

    let mut r = Reader::new(list);
    let mut entries = Vec::new();
    while !r.is_empty() {
        entries.push(r.opaque16("serialized SCT")?.to_vec());
    }
    if entries.is_empty() {
        return Err(DecodeError::EmptyList);
    }
    Ok(entries)
}

/// Encode serialized SCTs as a `SignedCertificateTimestampList`.
pub fn encode_sct_list<'a>(
    scts: impl IntoIterator<Item = &'a [u8]>,
) -> Result<Vec<u8>, EncodeError> {
    let mut inner = Vec::new();
    for sct in scts {
        put_opaque16(&mut inner, sct, "SCT")?;
    }
    let mut out = Vec::with_capacity(inner.len() + 2);
    put_opaque16(&mut out, &inner, "SCT list")?;
    Ok(out)
}

fn put_opaque16(out: &mut Vec<u8>, data: &[u8], field: &'static str) -> Result<(), EncodeError> {
    let len = u16::try_from(data.len()).map_err(|_| EncodeError {
        field,
        len: data.len(),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(data);
    Ok(())
}

/// Cursor over TLS-encoded bytes.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < n {
            return Err(DecodeError::Truncated(what));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, DecodeError> {
        let b = self.array::<2>(what)?;
        Ok(u16::from_be_bytes(b))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.array(what)?))
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let bytes = self.take(N, what)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(bytes);
        Ok(arr)
    }

    fn opaque16(&mut self, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.u16(what)?;
        self.take(usize::from(len), what)
    }

    fn finish(self) -> Result<(), DecodeError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes(self.buf.len()))
        }
    }
}
