//! Text and table output formatting.

use strongbox_core::{AuditBlock, ChainVerification, Entry, VaultHealth};

use crate::ui::{badge, kv, simple_table, Badge, Column, UiContext};

pub fn print_entry_list(ctx: &UiContext, entries: &[Entry]) {
    if entries.is_empty() {
        if ctx.mode.is_pretty() {
            println!("No entries yet.");
        }
        return;
    }
    let columns = [Column::new("ID"), Column::new("Created")];
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| vec![entry.id.clone(), entry.timestamp.clone()])
        .collect();
    println!("{}", simple_table(ctx, &columns, &rows));
}

pub fn print_entry(ctx: &UiContext, entry: &Entry, body: &str) {
    println!("{}", kv(ctx, "ID", &entry.id));
    println!("{}", kv(ctx, "Created", &entry.timestamp));
    println!();
    println!("{}", body);
}

pub fn print_blocks(ctx: &UiContext, blocks: &[AuditBlock]) {
    let columns = [
        Column::new("Seq"),
        Column::new("Time"),
        Column::new("Event"),
        Column::new("Detail"),
        Column::new("Hash"),
    ];
    let rows: Vec<Vec<String>> = blocks
        .iter()
        .map(|block| {
            let detail = match (&block.id, &block.file) {
                (Some(id), _) if block.detail.is_empty() => id.clone(),
                (_, Some(file)) if block.detail.is_empty() => file.clone(),
                _ => block.detail.clone(),
            };
            vec![
                block.seq.to_string(),
                block.ts.clone(),
                block.event.clone(),
                detail,
                short_hash(&block.block_hash).to_string(),
            ]
        })
        .collect();
    println!("{}", simple_table(ctx, &columns, &rows));
}

pub fn print_verification(ctx: &UiContext, verification: &ChainVerification) {
    if verification.ok {
        println!(
            "{}",
            badge(
                ctx,
                Badge::Ok,
                &format!("Audit chain intact ({} blocks)", verification.details.len())
            )
        );
    } else {
        println!(
            "{}",
            badge(
                ctx,
                Badge::Err,
                &format!("Audit chain broken ({} block(s) failed)", verification.breaks)
            )
        );
        for check in verification.details.iter().filter(|check| check.is_break()) {
            let mut reasons = Vec::new();
            if !check.block_matches {
                reasons.push("hash mismatch");
            }
            if !check.prev_matches {
                reasons.push("link mismatch");
            }
            println!("  {}", kv(ctx, &format!("Seq {}", check.seq), &reasons.join(", ")));
        }
    }
    println!(
        "{}",
        kv(ctx, "Head", verification.head.as_deref().unwrap_or("-"))
    );
}

pub fn print_health(ctx: &UiContext, health: &VaultHealth, storage_ok: bool) {
    let line = |ok: bool, message: &str| {
        let kind = if ok { Badge::Ok } else { Badge::Err };
        println!("{}", badge(ctx, kind, message));
    };

    line(storage_ok, "Storage integrity");
    line(health.initialized, "Vault initialized");
    match &health.failing_entries {
        Some(failing) if failing.is_empty() => line(
            true,
            &format!("Entry MACs ({} entries)", health.entry_count),
        ),
        Some(failing) => {
            line(
                false,
                &format!("Entry MACs ({} of {} failed)", failing.len(), health.entry_count),
            );
            for id in failing {
                println!("  {}", kv(ctx, "Entry", id));
            }
        }
        None => println!(
            "{}",
            badge(
                ctx,
                Badge::Info,
                &format!("Entry MACs not checked ({} entries)", health.entry_count)
            )
        ),
    }
    line(
        health.chain_breaks == 0,
        &format!(
            "Audit chain ({} blocks, {} break(s))",
            health.chain_blocks, health.chain_breaks
        ),
    );
    if !health.broken_seqs.is_empty() {
        let seqs: Vec<String> = health.broken_seqs.iter().map(|s| s.to_string()).collect();
        println!("  {}", kv(ctx, "Broken seqs", &seqs.join(",")));
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
