use tracing::warn;

use crate::app::AppContext;
use crate::cli::{BiometricArgs, CheckArgs, Toggle, WipeArgs};
use crate::errors::CliError;
use crate::helpers::confirm;
use crate::output::{health_json, print_health};
use crate::ui::receipt;

pub fn handle_check(ctx: &AppContext, args: &CheckArgs) -> anyhow::Result<()> {
    let opened = if args.no_unlock {
        ctx.open_vault(true)?
    } else {
        ctx.unlock_vault(false)?
    };

    let storage_ok = match opened.store.check_integrity() {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "storage integrity check failed");
            false
        }
    };
    let health = opened.vault.check()?;

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&health_json(&health, storage_ok))?
        );
    } else if !ctx.quiet() {
        print_health(&ui, &health, storage_ok);
    }

    if !(storage_ok && health.is_healthy()) {
        return Err(CliError::integrity_failed("Vault check failed").into());
    }
    Ok(())
}

pub fn handle_wipe(ctx: &AppContext, args: &WipeArgs) -> anyhow::Result<()> {
    let opened = ctx.open_vault(true)?;

    if !args.yes {
        let prompt = if args.include_audit {
            "Destroy all entries, key material AND the audit log? This cannot be undone"
        } else {
            "Destroy all entries and key material? This cannot be undone"
        };
        if !confirm(prompt, ctx.interactive(false))? {
            return Err(CliError::invalid_input(
                "Wipe not confirmed. Pass --yes to skip the prompt.",
            )
            .into());
        }
    }

    let options = ctx.config()?.wipe_options(args.include_audit);
    let mut vault = opened.vault.with_wipe_options(options);
    let report = vault.panic_wipe()?;

    if ctx.quiet() {
        return Ok(());
    }
    let ui = ctx.ui(false);
    let overwritten = report.entries_overwritten.to_string();
    let passes = report.passes.to_string();
    let audit = if report.audit_log_wiped { "removed" } else { "kept" };
    println!(
        "{}",
        receipt(
            &ui,
            "Vault wiped",
            &[
                ("Entries overwritten", overwritten.as_str()),
                ("Passes", passes.as_str()),
                ("Audit log", audit),
            ]
        )
    );
    Ok(())
}

pub fn handle_biometric(ctx: &AppContext, args: &BiometricArgs) -> anyhow::Result<()> {
    let opened = ctx.unlock_vault(args.no_input)?;
    let enabled = args.state == Toggle::On;
    opened.vault.set_biometric_enabled(enabled)?;

    if !ctx.quiet() {
        let ui = ctx.ui(false);
        let state = if enabled { "on" } else { "off" };
        println!("{}", receipt(&ui, "Biometric lock updated", &[("State", state)]));
    }
    Ok(())
}
