//! Strongbox CLI - an offline, encrypted journal with a tamper-evident audit chain
//!
//! Command-line interface over `strongbox-core`.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;
mod output;
mod ui;

use clap::Parser;
use strongbox_core::VERSION;
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::commands::{audit, entries, init, maintenance, misc};
use crate::constants::ENV_LOG;
use crate::ui::print_error;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let ctx = AppContext::new(&cli);

    if let Err(e) = run(&ctx, &cli) {
        let ui_ctx = ctx.ui(false);
        let error_msg = format!("{}", e);
        let (message, hint) = split_error_hint(&error_msg);
        print_error(&ui_ctx, message, hint.as_deref());
        std::process::exit(errors::exit_code(&e));
    }
}

/// Diagnostics go to stderr. `STRONGBOX_LOG` wins over the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Split an explicit "Hint:" line off the message, or supply one for common failures.
fn split_error_hint(error: &str) -> (&str, Option<String>) {
    if let Some(idx) = error.find("\nHint:") {
        let hint = error[idx + "\nHint:".len()..].trim();
        return (&error[..idx], Some(hint.to_string()));
    }

    let error_lower = error.to_lowercase();
    let hint = if error_lower.contains("not initialized") {
        Some("Run `strongbox init` to create a vault.")
    } else if error_lower.contains("entry not found") {
        Some("Run `strongbox list` to see entry IDs.")
    } else if error_lower.contains("audit chain integrity break") {
        Some("Run `strongbox verify` to see which blocks failed.")
    } else if error_lower.contains("integrity check failed") {
        Some("The stored entry was modified. Run `strongbox check` for details.")
    } else if error_lower.contains("storage unavailable") || error_lower.contains("sqlite error")
    {
        Some("Check that the vault file is readable and the disk is not full.")
    } else {
        None
    };
    (error, hint.map(str::to_string))
}

fn run(ctx: &AppContext, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Init(args)) => {
            init::handle_init(ctx, args)?;
        }
        Some(Commands::Add(args)) => {
            entries::handle_add(ctx, args)?;
        }
        Some(Commands::List(args)) => {
            entries::handle_list(ctx, args)?;
        }
        Some(Commands::Show(args)) => {
            entries::handle_show(ctx, args)?;
        }
        Some(Commands::Verify(args)) => {
            audit::handle_verify(ctx, args)?;
        }
        Some(Commands::Head) => {
            audit::handle_head(ctx)?;
        }
        Some(Commands::Log(args)) => {
            audit::handle_log(ctx, args)?;
        }
        Some(Commands::Export(args)) => {
            audit::handle_export(ctx, args)?;
        }
        Some(Commands::Check(args)) => {
            maintenance::handle_check(ctx, args)?;
        }
        Some(Commands::Wipe(args)) => {
            maintenance::handle_wipe(ctx, args)?;
        }
        Some(Commands::Biometric(args)) => {
            maintenance::handle_biometric(ctx, args)?;
        }
        Some(Commands::Completions(args)) => {
            misc::handle_completions(args)?;
        }
        None => {
            println!("Strongbox v{}", VERSION);
            println!("\nQuickstart:");
            println!("  strongbox init");
            println!("  strongbox add --body \"Hello\"");
            println!("  strongbox list");
            println!("  strongbox show <id>");
            println!("  strongbox verify");
            println!("\nRun `strongbox --help` for full usage.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_hint_is_split_off() {
        let (message, hint) = split_error_hint("No vault found at /x\nHint: Run init");
        assert_eq!(message, "No vault found at /x");
        assert_eq!(hint.as_deref(), Some("Run init"));
    }

    #[test]
    fn test_contextual_hint() {
        let (message, hint) = split_error_hint("Vault not initialized");
        assert_eq!(message, "Vault not initialized");
        assert!(hint.unwrap().contains("strongbox init"));
    }

    #[test]
    fn test_no_hint_for_unknown_errors() {
        assert_eq!(split_error_hint("boom").1, None);
    }
}
