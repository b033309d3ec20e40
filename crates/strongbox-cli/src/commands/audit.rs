use std::path::PathBuf;

use strongbox_core::audit::default_export_name;

use crate::app::AppContext;
use crate::cli::{ExportArgs, LogArgs, VerifyArgs};
use crate::errors::CliError;
use crate::output::{print_blocks, print_verification, verification_json};
use crate::ui::{header, receipt};

pub fn handle_verify(ctx: &AppContext, args: &VerifyArgs) -> anyhow::Result<()> {
    let opened = ctx.open_vault(true)?;
    let verification = opened.vault.verify_chain()?;

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&verification_json(&verification))?
        );
    } else if !ctx.quiet() || !verification.ok {
        print_verification(&ui, &verification);
    }

    if args.strict && !verification.ok {
        return Err(CliError::integrity_failed(format!(
            "Audit chain verification failed: {} broken block(s)",
            verification.breaks
        ))
        .into());
    }
    Ok(())
}

pub fn handle_head(ctx: &AppContext) -> anyhow::Result<()> {
    let opened = ctx.open_vault(true)?;
    match opened.vault.head()? {
        Some(head) => {
            println!("{}", head);
            Ok(())
        }
        None => Err(CliError::not_found(
            "Audit chain is empty",
            "Hint: Run `strongbox init` to create a vault.",
        )
        .into()),
    }
}

pub fn handle_log(ctx: &AppContext, args: &LogArgs) -> anyhow::Result<()> {
    let opened = ctx.open_vault(true)?;
    let mut blocks = opened.vault.audit_blocks()?;
    if let Some(limit) = args.limit {
        let skip = blocks.len().saturating_sub(limit);
        blocks.drain(..skip);
    }

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }
    if ui.mode.is_pretty() && !ctx.quiet() {
        let path = opened.path.display().to_string();
        println!("{}", header(&ui, "log", Some(path.as_str())));
        println!();
    }
    print_blocks(&ui, &blocks);
    Ok(())
}

pub fn handle_export(ctx: &AppContext, args: &ExportArgs) -> anyhow::Result<()> {
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => match ctx.config()?.export.directory.as_deref() {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => std::env::current_dir()
                .map_err(|e| anyhow::anyhow!("Failed to read current directory: {}", e))?,
        },
    };
    std::fs::create_dir_all(&dir).map_err(|e| {
        anyhow::anyhow!("Failed to create export directory {}: {}", dir.display(), e)
    })?;
    let name = args.name.clone().unwrap_or_else(default_export_name);

    let opened = ctx.open_vault(true)?;
    let paths = opened.vault.export_chain(&dir, &name)?;

    if ctx.quiet() {
        return Ok(());
    }
    let ui = ctx.ui(false);
    let jsonl = paths.jsonl.display().to_string();
    let manifest = paths.manifest.display().to_string();
    println!(
        "{}",
        receipt(
            &ui,
            "Audit chain exported",
            &[("Blocks", jsonl.as_str()), ("Manifest", manifest.as_str())]
        )
    );
    Ok(())
}
