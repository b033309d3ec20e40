//! UI primitives for the Strongbox CLI.
//!
//! - **Context**: environment detection (TTY, width, color, unicode)
//! - **Mode**: output mode resolution (json, plain, pretty)
//! - **Theme**: badges and text styles
//! - **Render**: tables, headers, receipts, hints, errors

mod context;
mod mode;
pub mod render;
pub mod theme;

pub use context::UiContext;
pub use theme::Badge;

pub use render::{badge, header, hint, kv, print_error, receipt, simple_table, Column};
