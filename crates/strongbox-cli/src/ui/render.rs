//! Rendering primitives for CLI output.

use comfy_table::{Attribute, Cell, ContentArrangement, Table as ComfyTable};

use super::context::UiContext;
use super::mode::OutputMode;
use super::theme::{styled, styles, Badge};

/// Render a header line for a command.
///
/// Pretty mode: "Strongbox · command" with the vault path on a second line
/// Plain mode: "strongbox command"
pub fn header(ctx: &UiContext, command: &str, path: Option<&str>) -> String {
    match ctx.mode {
        OutputMode::Pretty => {
            let title = styled("Strongbox", styles::bold(), ctx.color);
            let mut out = format!("{} \u{00B7} {}", title, command);
            if let Some(p) = path {
                let limit = ctx.width.clamp(20, 60);
                let display_path = if p.chars().count() > limit {
                    let tail: String = p.chars().rev().take(limit - 3).collect();
                    format!("...{}", tail.chars().rev().collect::<String>())
                } else {
                    p.to_string()
                };
                out.push_str(&format!("\n{}", kv(ctx, "Vault", &display_path)));
            }
            out
        }
        OutputMode::Plain => format!("strongbox {}", command),
        OutputMode::Json => String::new(),
    }
}

/// Render a badge with optional message.
pub fn badge(ctx: &UiContext, kind: Badge, message: &str) -> String {
    let colored_badge = styled(kind.display(ctx.unicode), kind.style(), ctx.color);
    if message.is_empty() {
        colored_badge
    } else {
        format!("{} {}", colored_badge, message)
    }
}

/// Render a key-value pair.
///
/// Pretty mode: "Key: value" with dim key
/// Plain mode: "key=value"
pub fn kv(ctx: &UiContext, key: &str, value: &str) -> String {
    if ctx.mode.is_pretty() {
        let styled_key = styled(&format!("{}:", key), styles::dim(), ctx.color);
        format!("{} {}", styled_key, value)
    } else {
        format!("{}={}", key.to_lowercase().replace(' ', "_"), value)
    }
}

/// Render a hint line.
pub fn hint(ctx: &UiContext, text: &str) -> String {
    if ctx.mode.is_pretty() {
        let label = styled("Hint:", styles::dim(), ctx.color);
        format!("{} {}", label, text)
    } else {
        format!("hint={}", text)
    }
}

/// Render a receipt (summary block after an action).
///
/// Pretty mode: badge plus indented key-value pairs
/// Plain mode: `status=ok` plus `key=value` lines
pub fn receipt(ctx: &UiContext, title: &str, items: &[(&str, &str)]) -> String {
    let mut lines = Vec::new();
    if ctx.mode.is_pretty() {
        lines.push(badge(ctx, Badge::Ok, title));
        for (key, value) in items {
            lines.push(format!("  {}", kv(ctx, key, value)));
        }
    } else {
        lines.push("status=ok".to_string());
        for (key, value) in items {
            lines.push(kv(ctx, key, value));
        }
    }
    lines.join("\n")
}

/// Column definition for table rendering.
#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
}

impl Column {
    pub const fn new(header: &'static str) -> Self {
        Self { header }
    }
}

/// Render a borderless table.
///
/// Pretty mode: dim headers, padded columns
/// Plain mode: tab-separated values, no header
pub fn simple_table(ctx: &UiContext, columns: &[Column], rows: &[Vec<String>]) -> String {
    if ctx.mode.is_pretty() {
        let mut table = ComfyTable::new();
        table.load_preset(comfy_table::presets::NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        let header_cells: Vec<Cell> = columns
            .iter()
            .map(|c| {
                let mut cell = Cell::new(c.header);
                if ctx.color {
                    cell = cell.add_attribute(Attribute::Dim);
                }
                cell
            })
            .collect();
        table.set_header(header_cells);

        for i in 0..columns.len() {
            if let Some(column) = table.column_mut(i) {
                column.set_padding((0, 2));
            }
        }

        for row in rows {
            table.add_row(row);
        }

        table.to_string()
    } else {
        rows.iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format an error message with optional hint.
///
/// Pretty mode: "[ERR] message" with optional "Hint: ..." on next line
/// Plain mode: "error=message" with optional "hint=suggestion"
pub fn error_message(ctx: &UiContext, message: &str, error_hint: Option<&str>) -> String {
    let mut lines = Vec::new();
    if ctx.mode.is_pretty() {
        lines.push(badge(ctx, Badge::Err, message));
        if let Some(h) = error_hint {
            lines.push(hint(ctx, h));
        }
    } else {
        lines.push(format!("error={}", message));
        if let Some(h) = error_hint {
            lines.push(format!("hint={}", h));
        }
    }
    lines.join("\n")
}

/// Print an error message to stderr with optional hint.
pub fn print_error(ctx: &UiContext, message: &str, error_hint: Option<&str>) {
    eprintln!("{}", error_message(ctx, message, error_hint));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_ctx() -> UiContext {
        UiContext {
            is_tty: false,
            color: false,
            unicode: false,
            width: 80,
            mode: OutputMode::Plain,
        }
    }

    fn pretty_ctx() -> UiContext {
        UiContext {
            is_tty: true,
            color: false,
            unicode: true,
            width: 80,
            mode: OutputMode::Pretty,
        }
    }

    #[test]
    fn test_header_plain() {
        assert_eq!(header(&plain_ctx(), "list", Some("/tmp/v.db")), "strongbox list");
    }

    #[test]
    fn test_header_pretty_truncates_long_path() {
        let ctx = pretty_ctx();
        let path = format!("/{}", "a".repeat(200));
        let h = header(&ctx, "list", Some(&path));
        assert!(h.contains("Strongbox"));
        assert!(h.contains("Vault: ..."));
        assert!(h.lines().nth(1).unwrap().chars().count() < 80);
    }

    #[test]
    fn test_kv_plain() {
        assert_eq!(kv(&plain_ctx(), "Chain Head", "abc"), "chain_head=abc");
    }

    #[test]
    fn test_kv_pretty() {
        assert_eq!(kv(&pretty_ctx(), "Head", "abc"), "Head: abc");
    }

    #[test]
    fn test_receipt_plain() {
        let out = receipt(&plain_ctx(), "Entry added", &[("ID", "1-abc")]);
        assert_eq!(out, "status=ok\nid=1-abc");
    }

    #[test]
    fn test_table_plain_is_tab_separated() {
        let columns = [Column::new("ID"), Column::new("Created")];
        let rows = vec![vec!["a".to_string(), "b".to_string()]];
        assert_eq!(simple_table(&plain_ctx(), &columns, &rows), "a\tb");
    }

    #[test]
    fn test_table_pretty_has_headers() {
        let columns = [Column::new("ID"), Column::new("Created")];
        let rows = vec![vec!["abc".to_string(), "today".to_string()]];
        let t = simple_table(&pretty_ctx(), &columns, &rows);
        assert!(t.contains("ID"));
        assert!(t.contains("Created"));
        assert!(t.contains("abc"));
    }

    #[test]
    fn test_error_message_plain() {
        let out = error_message(&plain_ctx(), "nope", Some("try again"));
        assert_eq!(out, "error=nope\nhint=try again");
    }

    #[test]
    fn test_badge_ok() {
        let b = badge(&plain_ctx(), Badge::Ok, "Done");
        assert_eq!(b, "[OK] Done");
    }
}
