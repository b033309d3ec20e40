//! The persisted, hash-linked audit chain.
//!
//! Blocks live in `vault_tamper_log` as a JSON array, newest first. All
//! reasoning (sequence numbers, linkage, verification, export) is done
//! oldest first. Every read-modify-write goes through one writer mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::audit::block::{AuditBlock, NewEvent};
use crate::audit::export::{ChainExport, ExportManifest};
use crate::audit::migrate::{generate_nonce, is_legacy, rebuild, MigrationOutcome};
use crate::crypto::primitives::now_iso8601;
use crate::error::{Result, VaultError};
use crate::store::{keys, VaultStore};

/// Per-block verification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockCheck {
    pub seq: u64,
    pub computed: String,
    pub stored: String,
    pub prev_matches: bool,
    pub block_matches: bool,
}

impl BlockCheck {
    pub fn is_break(&self) -> bool {
        !(self.prev_matches && self.block_matches)
    }
}

/// Outcome of walking the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub ok: bool,
    pub breaks: u32,
    /// Block hash of the newest block.
    pub head: Option<String>,
    /// One check per stored record, oldest first.
    pub details: Vec<BlockCheck>,
}

impl ChainVerification {
    /// Sequence numbers of the blocks that failed.
    pub fn broken_seqs(&self) -> Vec<u64> {
        self.details
            .iter()
            .filter(|check| check.is_break())
            .map(|check| check.seq)
            .collect()
    }

    /// Turn a failed verification into `ChainIntegrityBreak`.
    pub fn into_result(self) -> Result<Self> {
        if self.ok {
            Ok(self)
        } else {
            Err(VaultError::ChainIntegrityBreak {
                breaks: self.breaks,
            })
        }
    }
}

/// Verify stored records (newest first, as persisted).
///
/// Walks oldest to newest. A block breaks if its `prevHash` differs from the
/// previous block's stored hash or its stored hash differs from the hash of
/// its content. A record that cannot be read as a block is also a break.
pub fn verify_records(records_newest_first: &[Value]) -> ChainVerification {
    let mut prev: Option<String> = None;
    let mut details = Vec::with_capacity(records_newest_first.len());

    for (index, value) in records_newest_first.iter().rev().enumerate() {
        let stored = stored_hash(value).unwrap_or_default();
        let check = match serde_json::from_value::<AuditBlock>(value.clone()) {
            Ok(block) => {
                let computed = block.compute_hash();
                BlockCheck {
                    seq: block.seq,
                    prev_matches: block.prev_hash == prev,
                    block_matches: computed == block.block_hash,
                    computed,
                    stored: block.block_hash,
                }
            }
            Err(_) => BlockCheck {
                seq: value
                    .get("seq")
                    .and_then(Value::as_u64)
                    .unwrap_or(index as u64 + 1),
                computed: String::new(),
                stored: stored.clone(),
                prev_matches: false,
                block_matches: false,
            },
        };
        prev = if stored.is_empty() { None } else { Some(stored) };
        details.push(check);
    }

    let breaks = details.iter().filter(|check| check.is_break()).count() as u32;
    ChainVerification {
        ok: breaks == 0,
        breaks,
        head: records_newest_first.first().and_then(stored_hash),
        details,
    }
}

fn stored_hash(value: &Value) -> Option<String> {
    value
        .get("blockHash")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Append-only audit chain over a [`VaultStore`].
pub struct AuditChain {
    store: Arc<dyn VaultStore>,
    writer: Mutex<()>,
}

impl AuditChain {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Rewrite legacy records into canonical blocks.
    ///
    /// A log with no legacy records is left untouched, so the call is
    /// idempotent and a second run never writes.
    pub fn ensure_migrated(&self) -> Result<MigrationOutcome> {
        let _guard = self.lock_writer()?;
        self.migrate_locked()
    }

    /// Seal `event` as the next block and persist it.
    pub fn append_event(&self, event: NewEvent) -> Result<AuditBlock> {
        let _guard = self.lock_writer()?;
        self.migrate_locked()?;

        let mut records = self.load_raw()?;
        let last = records
            .iter()
            .filter_map(|value| serde_json::from_value::<AuditBlock>(value.clone()).ok())
            .max_by_key(|block| block.seq);
        let (seq, prev_hash) = match last {
            Some(block) => (block.seq + 1, Some(block.block_hash)),
            None => (1, None),
        };

        let block = AuditBlock::seal(
            seq,
            now_iso8601(),
            generate_nonce()?,
            event,
            prev_hash,
            Map::new(),
        );
        debug!(seq = block.seq, event = %block.event, "appending audit block");

        records.insert(0, serde_json::to_value(&block)?);
        self.write_raw(&records)?;
        Ok(block)
    }

    /// Migrate, then verify every block.
    pub fn verify_chain(&self) -> Result<ChainVerification> {
        self.ensure_migrated()?;
        let verification = verify_records(&self.load_raw()?);
        if !verification.ok {
            warn!(
                breaks = verification.breaks,
                seqs = ?verification.broken_seqs(),
                "audit chain integrity break"
            );
        }
        Ok(verification)
    }

    /// Block hash of the newest block, if any.
    pub fn head_fingerprint(&self) -> Result<Option<String>> {
        Ok(self.load_raw()?.first().and_then(stored_hash))
    }

    /// Readable blocks, oldest first. Unreadable records are skipped.
    pub fn blocks(&self) -> Result<Vec<AuditBlock>> {
        Ok(self
            .load_raw()?
            .into_iter()
            .rev()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect())
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        Ok(self.load_raw()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Build the JSONL export and its manifest from the stored log.
    ///
    /// Reads only; callers that want a migrated export run
    /// [`ensure_migrated`](Self::ensure_migrated) first.
    pub fn export_chain_files(&self) -> Result<ChainExport> {
        let records = self.load_raw()?;
        let verification = verify_records(&records);

        let mut jsonl = String::new();
        for value in records.iter().rev() {
            jsonl.push_str(&serde_json::to_string(value)?);
            jsonl.push('\n');
        }

        Ok(ChainExport {
            jsonl,
            manifest: ExportManifest::new(records.len(), &verification),
        })
    }

    /// Drop the whole log.
    pub(crate) fn clear(&self) -> Result<()> {
        let _guard = self.lock_writer()?;
        self.store.remove(keys::TAMPER_LOG)
    }

    fn migrate_locked(&self) -> Result<MigrationOutcome> {
        let records = self.load_raw()?;
        let total = records.len();
        let legacy_records = records.iter().filter(|value| is_legacy(value)).count();
        if legacy_records == 0 {
            return Ok(MigrationOutcome {
                migrated: false,
                legacy_records,
                total,
            });
        }

        let mut blocks = rebuild(records)?;
        blocks.reverse();
        let rebuilt = blocks
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.write_raw(&rebuilt)?;

        info!(legacy_records, total, "migrated audit log to chained format");
        Ok(MigrationOutcome {
            migrated: true,
            legacy_records,
            total,
        })
    }

    fn load_raw(&self) -> Result<Vec<Value>> {
        match self.store.get(keys::TAMPER_LOG)? {
            None => Ok(Vec::new()),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(Value::Array(records)) => Ok(records),
                Ok(_) => Err(VaultError::StorageUnavailable(
                    "Corrupt audit log: not an array".to_string(),
                )),
                Err(e) => Err(VaultError::StorageUnavailable(format!(
                    "Corrupt audit log: {}",
                    e
                ))),
            },
        }
    }

    fn write_raw(&self, records: &[Value]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.store.set(keys::TAMPER_LOG, &raw)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| VaultError::StorageUnavailable("audit writer poisoned".to_string()))
    }
}
