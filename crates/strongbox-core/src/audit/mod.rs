//! Tamper-evident audit chain.
//!
//! Every security-relevant operation is recorded as a block whose hash
//! covers its content and the previous block's hash. Editing, dropping or
//! reordering a stored block breaks verification at that block.

pub mod block;
pub mod chain;
pub mod events;
pub mod export;
pub mod migrate;

pub use block::{AuditBlock, NewEvent};
pub use chain::{verify_records, AuditChain, BlockCheck, ChainVerification};
pub use export::{default_export_name, ChainExport, ExportManifest, ExportPaths};
pub use migrate::{is_legacy, normalize_timestamp, MigrationOutcome};
