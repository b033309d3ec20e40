use std::path::{Path, PathBuf};

use strongbox_core::crypto::validate_passphrase;
use tracing::{debug, info, warn};

use crate::app::{resolve_config_path, AppContext};
use crate::cli::InitArgs;
use crate::config::{write_config, StrongboxConfig};
use crate::helpers::prompt_init_passphrase;
use crate::ui::{hint, receipt};

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let ui = ctx.ui(false);
    let path = match &args.path {
        Some(path) => absolute(path)?,
        None => absolute(&ctx.vault_path()?)?,
    };
    let interactive = ctx.interactive(args.no_input);
    let passphrase = prompt_init_passphrase(interactive)?;
    validate_passphrase(&passphrase)?;

    let existed = path.exists();
    let mut opened = ctx.open_vault_at(path.clone(), args.no_input)?;
    let record = match opened.vault.create(&passphrase) {
        Ok(record) => record,
        Err(e) => {
            drop(opened);
            if !existed {
                discard_vault_file(&path);
            }
            return Err(e.into());
        }
    };
    info!(path = %path.display(), "vault initialized");

    if ctx.config()?.security.biometric_enabled {
        opened.vault.set_biometric_enabled(true)?;
    }

    let config_path = resolve_config_path()?;
    let config_written = if config_path.exists() {
        debug!(path = %config_path.display(), "config exists, leaving it alone");
        false
    } else {
        write_config(&config_path, &StrongboxConfig::new(&path))?;
        true
    };

    if ctx.quiet() {
        return Ok(());
    }

    let path_display = path.display().to_string();
    let config_display = config_path.display().to_string();
    let iterations = record.iterations.to_string();
    let mut items = vec![
        ("Vault", path_display.as_str()),
        ("Iterations", iterations.as_str()),
    ];
    if config_written {
        items.push(("Config", config_display.as_str()));
    }
    println!("{}", receipt(&ui, "Vault created", &items));
    println!("{}", hint(&ui, "strongbox add --body \"first entry\""));
    Ok(())
}

/// Remove a database file created by a failed init, with its SQLite sidecars.
fn discard_vault_file(path: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        let file = PathBuf::from(name);
        if file.exists() {
            if let Err(e) = std::fs::remove_file(&file) {
                warn!(path = %file.display(), error = %e, "could not remove vault file");
            }
        }
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| anyhow::anyhow!("Failed to read current directory: {}", e))?;
    Ok(cwd.join(path))
}
