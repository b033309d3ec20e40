use zeroize::Zeroizing;

use crate::app::AppContext;
use crate::cli::{AddArgs, ListArgs, ShowArgs};
use crate::errors::CliError;
use crate::helpers::read_entry_body;
use crate::output::{entries_json, entry_json, print_entry, print_entry_list};
use crate::ui::{header, receipt};

pub fn handle_add(ctx: &AppContext, args: &AddArgs) -> anyhow::Result<()> {
    let body = read_entry_body(args.no_input, args.body.clone())?;
    let opened = ctx.unlock_vault(args.no_input)?;
    let entry = opened.vault.add_entry(&body)?;

    if ctx.quiet() {
        println!("{}", entry.id);
        return Ok(());
    }
    let ui = ctx.ui(false);
    println!(
        "{}",
        receipt(
            &ui,
            "Entry added",
            &[("ID", entry.id.as_str()), ("Created", entry.timestamp.as_str())]
        )
    );
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &ListArgs) -> anyhow::Result<()> {
    let opened = ctx.open_vault(true)?;
    let mut entries = opened.vault.list_entries()?;
    if let Some(limit) = args.limit {
        entries.truncate(limit);
    }

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&entries_json(&entries))?);
        return Ok(());
    }
    if ui.mode.is_pretty() && !ctx.quiet() {
        let path = opened.path.display().to_string();
        println!("{}", header(&ui, "list", Some(path.as_str())));
        println!();
    }
    print_entry_list(&ui, &entries);
    Ok(())
}

pub fn handle_show(ctx: &AppContext, args: &ShowArgs) -> anyhow::Result<()> {
    let opened = ctx.unlock_vault(args.no_input)?;
    let entry = opened
        .vault
        .list_entries()?
        .into_iter()
        .find(|entry| entry.id == args.id)
        .ok_or_else(|| {
            CliError::not_found(
                format!("Entry not found: {}", args.id),
                "Hint: Run `strongbox list` to see entry IDs.",
            )
        })?;
    let body = Zeroizing::new(opened.vault.read_entry(&entry.id)?);

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&entry_json(&entry, Some(body.as_str())))?
        );
    } else {
        print_entry(&ui, &entry, &body);
    }
    Ok(())
}
