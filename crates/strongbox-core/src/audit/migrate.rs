//! Migration of legacy, unchained log records into canonical blocks.
//!
//! Older logs stored bare records without `prevHash`/`blockHash`. A record is
//! legacy when it is not a JSON object, has no string `blockHash`, or has no
//! `prevHash` key at all (an explicit `null` is canonical for block 1).
//!
//! Rebuilding is tolerant: unparsable timestamps become "now", missing nonces
//! are generated, non-string details are JSON-encoded, and any field we do
//! not recognize is kept verbatim under `legacy`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::audit::block::{AuditBlock, NewEvent};
use crate::audit::events;
use crate::crypto::primitives::{format_iso8601, now_iso8601, random_bytes};
use crate::error::Result;

/// Nonce length in bytes.
pub const NONCE_LENGTH: usize = 8;

/// What `ensure_migrated` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationOutcome {
    /// Whether the stored log was rewritten.
    pub migrated: bool,
    /// Records that needed migration.
    pub legacy_records: usize,
    /// Records in the log after the call.
    pub total: usize,
}

/// Whether a stored record predates the chained format.
pub fn is_legacy(record: &Value) -> bool {
    match record.as_object() {
        None => true,
        Some(object) => {
            !object.get("blockHash").is_some_and(Value::is_string)
                || !object.contains_key("prevHash")
        }
    }
}

/// A stored record reduced to the fields migration understands.
#[derive(Debug, Default)]
struct LegacyRecord {
    ts: Option<Value>,
    nonce: Option<String>,
    event: Option<String>,
    detail: Option<Value>,
    id: Option<String>,
    file: Option<String>,
    hash: Option<String>,
    custody: Option<String>,
    signature: Option<String>,
    extra: Map<String, Value>,
}

impl LegacyRecord {
    fn from_value(value: Value) -> Self {
        let mut object = match value {
            Value::Object(object) => object,
            // A bare value is kept as the record's detail
            other => {
                return Self {
                    detail: Some(other),
                    ..Self::default()
                }
            }
        };

        // Chain fields are always recomputed
        for key in ["seq", "prevHash", "blockHash"] {
            object.remove(key);
        }

        let mut extra = match object.remove("legacy") {
            Some(Value::Object(previous)) => previous,
            Some(other) => {
                let mut map = Map::new();
                map.insert("legacy".to_string(), other);
                map
            }
            None => Map::new(),
        };

        let ts = object.remove("ts").or_else(|| object.remove("timestamp"));
        let record = Self {
            ts,
            nonce: take_string(&mut object, "nonce"),
            event: take_string(&mut object, "event"),
            detail: object.remove("detail"),
            id: take_string(&mut object, "id"),
            file: take_string(&mut object, "file"),
            hash: take_string(&mut object, "hash"),
            custody: take_string(&mut object, "custody"),
            signature: take_string(&mut object, "signature"),
            extra: Map::new(),
        };
        extra.extend(object);
        Self { extra, ..record }
    }
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    object.remove(key).and_then(value_to_string)
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Normalize a stored timestamp to ISO-8601 UTC milliseconds.
///
/// Accepts RFC 3339 strings and epoch milliseconds (number or numeric
/// string). Anything else becomes the current time.
pub fn normalize_timestamp(value: Option<&Value>) -> String {
    let parsed = match value {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|at| at.with_timezone(&Utc))
            .ok()
            .or_else(|| text.trim().parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)),
        Some(Value::Number(number)) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    parsed.map(format_iso8601).unwrap_or_else(now_iso8601)
}

pub(crate) fn generate_nonce() -> Result<String> {
    Ok(hex::encode(random_bytes(NONCE_LENGTH)?))
}

/// Rebuild a newest-first record array into a chronological, fully linked chain.
pub(crate) fn rebuild(records_newest_first: Vec<Value>) -> Result<Vec<AuditBlock>> {
    let mut blocks: Vec<AuditBlock> = Vec::with_capacity(records_newest_first.len());
    let mut prev_hash: Option<String> = None;

    for (index, value) in records_newest_first.into_iter().rev().enumerate() {
        let record = LegacyRecord::from_value(value);
        let nonce = match record.nonce {
            Some(nonce) if !nonce.is_empty() => nonce,
            _ => generate_nonce()?,
        };
        let event = NewEvent {
            event: record
                .event
                .filter(|event| !event.is_empty())
                .unwrap_or_else(|| events::UNKNOWN.to_string()),
            detail: record.detail.and_then(value_to_string).unwrap_or_default(),
            id: record.id,
            file: record.file,
            hash: record.hash,
            custody: record.custody,
            signature: record.signature,
        };

        let block = AuditBlock::seal(
            index as u64 + 1,
            normalize_timestamp(record.ts.as_ref()),
            nonce,
            event,
            prev_hash.take(),
            record.extra,
        );
        prev_hash = Some(block.block_hash.clone());
        blocks.push(block);
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_detection() {
        assert!(is_legacy(&json!("bare string")));
        assert!(is_legacy(&json!({"event": "unlocked"})));
        assert!(is_legacy(&json!({"event": "unlocked", "blockHash": "ab"})));
        assert!(is_legacy(&json!({"blockHash": null, "prevHash": null})));
        assert!(!is_legacy(&json!({"blockHash": "ab", "prevHash": null})));
        assert!(!is_legacy(&json!({"blockHash": "ab", "prevHash": "cd"})));
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp(Some(&json!("2024-01-01T00:00:00Z"))),
            "2024-01-01T00:00:00.000Z"
        );
        assert_eq!(
            normalize_timestamp(Some(&json!("2024-01-01T02:00:00.5+02:00"))),
            "2024-01-01T00:00:00.500Z"
        );
        assert_eq!(
            normalize_timestamp(Some(&json!(1704067200000_i64))),
            "2024-01-01T00:00:00.000Z"
        );
        assert_eq!(
            normalize_timestamp(Some(&json!("1704067200000"))),
            "2024-01-01T00:00:00.000Z"
        );
        // Canonical timestamps are a fixed point
        assert_eq!(
            normalize_timestamp(Some(&json!("2024-01-01T00:00:00.000Z"))),
            "2024-01-01T00:00:00.000Z"
        );

        let before = Utc::now();
        let fallback = normalize_timestamp(Some(&json!("yesterday-ish")));
        let parsed = DateTime::parse_from_rfc3339(&fallback).unwrap();
        assert!(parsed.with_timezone(&Utc) >= before - chrono::Duration::seconds(1));
        assert!(normalize_timestamp(None).ends_with('Z'));
    }

    #[test]
    fn test_rebuild_links_chronologically() {
        // newest first, as stored
        let records = vec![
            json!({"event": "entry_added", "detail": "second", "ts": "2024-01-02T00:00:00.000Z"}),
            json!({"event": "vault_created", "detail": "first", "ts": "2024-01-01T00:00:00.000Z"}),
        ];
        let blocks = rebuild(records).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].seq, 1);
        assert_eq!(blocks[0].event, "vault_created");
        assert_eq!(blocks[0].prev_hash, None);
        assert_eq!(blocks[1].seq, 2);
        assert_eq!(blocks[1].prev_hash.as_deref(), Some(blocks[0].block_hash.as_str()));
        assert!(blocks.iter().all(AuditBlock::is_sealed));
        assert!(blocks.iter().all(|b| b.nonce.len() == NONCE_LENGTH * 2));
    }

    #[test]
    fn test_rebuild_preserves_unknown_fields_and_values() {
        let records = vec![json!({
            "event": "legacy_view",
            "detail": {"screen": "journal"},
            "nonce": "feedfacefeedface",
            "id": 42,
            "device": "phone",
            "blockHash": "stale",
            "legacy": {"origin": "v0"}
        })];
        let blocks = rebuild(records).unwrap();
        let block = &blocks[0];

        assert_eq!(block.nonce, "feedfacefeedface");
        assert_eq!(block.detail, r#"{"screen":"journal"}"#);
        assert_eq!(block.id.as_deref(), Some("42"));
        assert_eq!(block.legacy.get("device"), Some(&json!("phone")));
        assert_eq!(block.legacy.get("origin"), Some(&json!("v0")));
        assert!(!block.legacy.contains_key("blockHash"));
        assert_ne!(block.block_hash, "stale");
    }

    #[test]
    fn test_rebuild_bare_values() {
        let blocks = rebuild(vec![json!("opened app"), json!(null)]).unwrap();
        assert_eq!(blocks[0].event, events::UNKNOWN);
        assert_eq!(blocks[0].detail, "");
        assert_eq!(blocks[1].detail, "opened app");
    }

    #[test]
    fn test_rebuild_of_canonical_chain_is_identity() {
        let first = rebuild(vec![
            json!({"event": "b", "detail": "2", "ts": "2024-01-02T00:00:00.000Z", "nonce": "01"}),
            json!({"event": "a", "detail": "1", "ts": "2024-01-01T00:00:00.000Z", "nonce": "00"}),
        ])
        .unwrap();
        let stored: Vec<Value> = first
            .iter()
            .rev()
            .map(|block| serde_json::to_value(block).unwrap())
            .collect();
        let second = rebuild(stored).unwrap();
        assert_eq!(first, second);
    }
}
