//! Test fixtures - transparency logs and SCTs minted on the fly.

#![allow(dead_code)]

use base64::{Engine as _, engine::general_purpose::STANDARD};
use btget::transparency::sct::{
    HASH_INTRINSIC, HASH_SHA256, SCT_VERSION_V1, SIG_ECDSA, SIG_ED25519, encode_sct_list,
};
use btget::transparency::{Digest, LogId, Sct, SctBundle};
use p256::ecdsa::signature::Signer as _;
use p256::pkcs8::EncodePublicKey as _;

/// Artifact body used by most tests.
pub const ARTIFACT: &[u8] = b"#!/bin/sh\necho hello from a transparent binary\n";

pub const ARTIFACT_URL: &str = "https://downloads.example.com/releases/tool-1.0.sh";

enum Signer {
    P256(p256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// A transparency log we hold the private key for.
pub struct TestLog {
    signer: Signer,
    pub description: String,
    pub key_der: Vec<u8>,
    pub state: &'static str,
}

impl TestLog {
    pub fn p256(seed: u8, description: &str) -> Self {
        let sk = p256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap();
        let key_der = sk.verifying_key().to_public_key_der().unwrap().into_vec();
        Self {
            signer: Signer::P256(sk),
            description: description.to_string(),
            key_der,
            state: "usable",
        }
    }

    pub fn ed25519(seed: u8, description: &str) -> Self {
        let sk = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
        let key_der = sk.verifying_key().to_public_key_der().unwrap().into_vec();
        Self {
            signer: Signer::Ed25519(sk),
            description: description.to_string(),
            key_der,
            state: "usable",
        }
    }

    pub fn with_state(mut self, state: &'static str) -> Self {
        self.state = state;
        self
    }

    pub fn id(&self) -> LogId {
        LogId::from_spki_der(&self.key_der)
    }

    /// Issue an SCT over `digest`, serialized.
    pub fn mint(&self, digest: &Digest, timestamp: u64) -> Vec<u8> {
        let (hash_algorithm, signature_algorithm) = match self.signer {
            Signer::P256(_) => (HASH_SHA256, SIG_ECDSA),
            Signer::Ed25519(_) => (HASH_INTRINSIC, SIG_ED25519),
        };
        let mut sct = Sct {
            version: SCT_VERSION_V1,
            log_id: self.id(),
            timestamp,
            extensions: Vec::new(),
            hash_algorithm,
            signature_algorithm,
            signature: Vec::new(),
        };

        let payload = sct.signed_payload(digest).unwrap();
        sct.signature = match &self.signer {
            Signer::P256(sk) => {
                let sig: p256::ecdsa::Signature = sk.sign(&payload);
                sig.to_der().as_bytes().to_vec()
            }
            Signer::Ed25519(sk) => ed25519_dalek::Signer::sign(sk, &payload).to_bytes().to_vec(),
        };
        sct.encode().unwrap()
    }
}

/// v3 log list with one operator holding `logs`.
pub fn log_list_json(logs: &[&TestLog]) -> Vec<u8> {
    let entries: Vec<_> = logs
        .iter()
        .map(|log| {
            serde_json::json!({
                "description": log.description,
                "log_id": log.id().to_base64(),
                "key": STANDARD.encode(&log.key_der),
                "url": "https://ct.example.com/",
                "state": { log.state: { "timestamp": "2024-01-01T00:00:00Z" } }
            })
        })
        .collect();

    serde_json::to_vec(&serde_json::json!({
        "version": "3.0",
        "operators": [{ "name": "Test Operator", "logs": entries }]
    }))
    .unwrap()
}

/// Value for the SCT response header.
pub fn sct_header(scts: &[Vec<u8>]) -> String {
    STANDARD.encode(encode_sct_list(scts.iter().map(Vec::as_slice)).unwrap())
}

/// JSON SCT bundle, as served in a sidecar or stored with `--sct-file`.
pub fn sct_bundle(digest: Option<&Digest>, scts: &[Vec<u8>]) -> Vec<u8> {
    let bundle = SctBundle {
        sha256: digest.map(Digest::to_hex),
        scts: scts.iter().map(|s| STANDARD.encode(s)).collect(),
    };
    serde_json::to_vec(&bundle).unwrap()
}

pub fn digest_of(bytes: &[u8]) -> Digest {
    btget::transparency::digest::compute(bytes).unwrap()
}
