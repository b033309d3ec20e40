use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};
use strongbox_core::audit::ExportManifest;
use strongbox_core::store::keys;
use strongbox_core::{AuditChain, MemoryVaultStore, NewEvent, Vault, VaultError, VaultStore};
use tempfile::TempDir;

const PASSPHRASE: &str = "correct-horse-battery";

fn unlocked_vault() -> (Arc<MemoryVaultStore>, Vault) {
    let store = Arc::new(MemoryVaultStore::new());
    let mut vault = Vault::open(store.clone());
    vault.create(PASSPHRASE).expect("create should succeed");
    (store, vault)
}

fn stored_log(store: &MemoryVaultStore) -> Vec<Value> {
    let raw = store
        .get(keys::TAMPER_LOG)
        .expect("get")
        .expect("log present");
    serde_json::from_str(&raw).expect("log is JSON")
}

fn replace_log(store: &MemoryVaultStore, records: &[Value]) {
    store
        .set(
            keys::TAMPER_LOG,
            &serde_json::to_string(records).expect("serialize"),
        )
        .expect("set");
}

#[test]
fn test_sequence_is_monotonic_and_linked() {
    let (_store, vault) = unlocked_vault();
    for n in 0..10 {
        vault.add_entry(&format!("entry {}", n)).expect("add");
    }

    let blocks = vault.audit_blocks().expect("blocks");
    assert_eq!(blocks.len(), 11);
    for (index, block) in blocks.iter().enumerate() {
        assert_eq!(block.seq, index as u64 + 1);
        assert!(block.is_sealed());
        if index == 0 {
            assert!(block.prev_hash.is_none());
        } else {
            assert_eq!(
                block.prev_hash.as_deref(),
                Some(blocks[index - 1].block_hash.as_str())
            );
        }
    }
    assert_eq!(
        vault.head().expect("head").as_deref(),
        Some(blocks[10].block_hash.as_str())
    );
}

#[test]
fn test_tampered_detail_is_attributed_to_its_seq() {
    let (store, vault) = unlocked_vault();
    for n in 0..4 {
        vault.add_entry(&format!("entry {}", n)).expect("add");
    }

    let mut records = stored_log(&store);
    let target = records
        .iter_mut()
        .find(|record| record["seq"] == 3)
        .expect("seq 3 present");
    target["detail"] = json!("nothing happened here");
    replace_log(&store, &records);

    let verification = vault.verify_chain().expect("verify");
    assert!(!verification.ok);
    assert_eq!(verification.breaks, 1);
    assert_eq!(verification.broken_seqs(), vec![3]);

    let err = verification.into_result().unwrap_err();
    assert!(matches!(err, VaultError::ChainIntegrityBreak { breaks: 1 }));

    let last = vault.audit_blocks().expect("blocks").pop().expect("last");
    assert_eq!(last.event, "chain_verified");
    assert_eq!(last.detail, "breaks=1");
}

#[test]
fn test_dropped_block_breaks_the_link() {
    let (store, vault) = unlocked_vault();
    for n in 0..3 {
        vault.add_entry(&format!("entry {}", n)).expect("add");
    }

    let mut records = stored_log(&store);
    records.retain(|record| record["seq"] != 2);
    replace_log(&store, &records);

    let verification = vault.verify_chain().expect("verify");
    assert_eq!(verification.broken_seqs(), vec![3]);
}

#[test]
fn test_legacy_log_is_migrated_once() {
    let store = Arc::new(MemoryVaultStore::new());
    replace_log(
        &store,
        &[
            json!({
                "event": "entry_added",
                "id": "1704153600000-abcdef",
                "timestamp": 1704153600000_i64
            }),
            json!({"event": "unlocked", "ts": "not a time", "app": "mobile"}),
            json!({"event": "vault_created", "detail": ["a", 1], "ts": "2024-01-01T00:00:00Z"}),
        ],
    );
    let chain = AuditChain::new(store.clone());

    let outcome = chain.ensure_migrated().expect("migrate");
    assert!(outcome.migrated);
    assert_eq!(outcome.legacy_records, 3);
    let first = store.get(keys::TAMPER_LOG).expect("get");

    let outcome = chain.ensure_migrated().expect("migrate again");
    assert!(!outcome.migrated);
    assert_eq!(store.get(keys::TAMPER_LOG).expect("get"), first);

    let blocks = chain.blocks().expect("blocks");
    assert_eq!(blocks[0].event, "vault_created");
    assert_eq!(blocks[0].detail, r#"["a",1]"#);
    assert_eq!(blocks[1].legacy.get("app"), Some(&json!("mobile")));
    assert!(blocks[1].ts.ends_with('Z'));
    assert_eq!(blocks[2].id.as_deref(), Some("1704153600000-abcdef"));
    assert!(chain.verify_chain().expect("verify").ok);

    let next = chain
        .append_event(NewEvent::new("locked", ""))
        .expect("append");
    assert_eq!(next.seq, 4);
}

#[test]
fn test_export_writes_jsonl_and_manifest() {
    let (_store, vault) = unlocked_vault();
    vault.add_entry("exported").expect("add");
    let head_before = vault.head().expect("head");

    let dir = TempDir::new().expect("tempdir");
    let paths = vault
        .export_chain(dir.path(), "evidence")
        .expect("export should succeed");

    let jsonl = fs::read_to_string(&paths.jsonl).expect("read jsonl");
    let seqs: Vec<u64> = jsonl
        .lines()
        .map(|line| {
            serde_json::from_str::<Value>(line).expect("line is JSON")["seq"]
                .as_u64()
                .expect("seq")
        })
        .collect();
    assert_eq!(seqs, vec![1, 2]);

    let manifest: ExportManifest =
        serde_json::from_str(&fs::read_to_string(&paths.manifest).expect("read manifest"))
            .expect("manifest is JSON");
    assert_eq!(manifest.count, 2);
    assert_eq!(manifest.chain_head, head_before);
    assert!(manifest.verify.ok);
    assert_eq!(manifest.timezone, "UTC");

    let last = vault.audit_blocks().expect("blocks").pop().expect("last");
    assert_eq!(last.event, "chain_exported");
    assert_eq!(last.file.as_deref(), Some("evidence"));
}

#[test]
fn test_export_rejects_path_in_name() {
    let (_store, vault) = unlocked_vault();
    let dir = TempDir::new().expect("tempdir");
    assert!(matches!(
        vault.export_chain(dir.path(), "../escape"),
        Err(VaultError::InvalidInput(_))
    ));
    // nothing recorded for a failed export
    let last = vault.audit_blocks().expect("blocks").pop().expect("last");
    assert_eq!(last.event, "vault_created");
}

#[test]
fn test_low_iteration_request_is_raised() {
    let store = Arc::new(MemoryVaultStore::new());
    let mut vault = Vault::open(store.clone()).with_iterations(1_000);
    let record = vault.create(PASSPHRASE).expect("create should succeed");

    assert_eq!(record.iterations, 100_000);
    assert_eq!(
        store.get(keys::ITERATIONS).expect("get").as_deref(),
        Some("100000")
    );
}

#[test]
fn test_failed_storage_surfaces_as_storage_error() {
    let (store, vault) = unlocked_vault();
    store.fail_writes(true);
    let err = vault.add_entry("lost").unwrap_err();
    assert!(matches!(err, VaultError::StorageUnavailable(_)));
    assert!(err.is_retryable());

    store.fail_writes(false);
    assert_eq!(vault.list_entries().expect("list").len(), 0);
}
