//! Audit block type and canonical hashing.
//!
//! `blockHash` is SHA-256 over the pipe-joined canonical string
//!
//! ```text
//! seq|ts|event|detail|id|file|hash|signature|prevHash
//! ```
//!
//! with absent fields as empty strings. The field order and separator are
//! part of the on-disk format: changing either makes every stored chain
//! unverifiable. `nonce`, `custody` and `legacy` are metadata and are not
//! hashed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::primitives::sha256_hex;

/// One record in the audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditBlock {
    pub seq: u64,
    pub ts: String,
    pub nonce: String,
    pub event: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custody: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// `null` only for the first block; always serialized.
    pub prev_hash: Option<String>,
    pub block_hash: String,
    /// Fields carried over from a migrated legacy record.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub legacy: Map<String, Value>,
}

impl AuditBlock {
    /// The canonical string the block hash is computed over.
    pub fn canon(&self) -> String {
        let seq = self.seq.to_string();
        let fields: [&str; 9] = [
            &seq,
            &self.ts,
            &self.event,
            &self.detail,
            self.id.as_deref().unwrap_or(""),
            self.file.as_deref().unwrap_or(""),
            self.hash.as_deref().unwrap_or(""),
            self.signature.as_deref().unwrap_or(""),
            self.prev_hash.as_deref().unwrap_or(""),
        ];
        fields.join("|")
    }

    /// SHA-256 of [`canon`](Self::canon), hex.
    pub fn compute_hash(&self) -> String {
        sha256_hex(self.canon().as_bytes())
    }

    /// Build a block from an event and seal it with its hash.
    pub(crate) fn seal(
        seq: u64,
        ts: String,
        nonce: String,
        event: NewEvent,
        prev_hash: Option<String>,
        legacy: Map<String, Value>,
    ) -> Self {
        let mut block = AuditBlock {
            seq,
            ts,
            nonce,
            event: event.event,
            detail: event.detail,
            id: event.id,
            file: event.file,
            hash: event.hash,
            custody: event.custody,
            signature: event.signature,
            prev_hash,
            block_hash: String::new(),
            legacy,
        };
        block.block_hash = block.compute_hash();
        block
    }

    /// Whether the stored hash matches the block's content.
    pub fn is_sealed(&self) -> bool {
        self.block_hash == self.compute_hash()
    }
}

/// The caller-supplied part of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEvent {
    pub event: String,
    pub detail: String,
    pub id: Option<String>,
    pub file: Option<String>,
    pub hash: Option<String>,
    pub custody: Option<String>,
    pub signature: Option<String>,
}

impl NewEvent {
    pub fn new(event: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            detail: detail.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_custody(mut self, custody: impl Into<String>) -> Self {
        self.custody = Some(custody.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}
