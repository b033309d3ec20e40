//! JSON output formatting.

use serde_json::json;
use strongbox_core::{ChainVerification, Entry, VaultHealth};

/// Entry metadata, plus the decrypted body when given.
pub fn entry_json(entry: &Entry, body: Option<&str>) -> serde_json::Value {
    let mut value = json!({
        "id": entry.id,
        "timestamp": entry.timestamp,
    });
    if let Some(text) = body {
        value["body"] = json!(text);
    }
    value
}

pub fn entries_json(entries: &[Entry]) -> Vec<serde_json::Value> {
    entries.iter().map(|entry| entry_json(entry, None)).collect()
}

pub fn verification_json(verification: &ChainVerification) -> serde_json::Value {
    json!({
        "ok": verification.ok,
        "breaks": verification.breaks,
        "broken_seqs": verification.broken_seqs(),
        "head": verification.head,
        "blocks": verification.details.len(),
    })
}

pub fn health_json(health: &VaultHealth, storage_ok: bool) -> serde_json::Value {
    json!({
        "healthy": storage_ok && health.is_healthy(),
        "storage_ok": storage_ok,
        "initialized": health.initialized,
        "entry_count": health.entry_count,
        "failing_entries": health.failing_entries,
        "chain_blocks": health.chain_blocks,
        "chain_breaks": health.chain_breaks,
        "broken_seqs": health.broken_seqs,
        "head": health.head,
    })
}
