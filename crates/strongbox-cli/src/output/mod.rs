//! Output formatting for entries, audit blocks and verification results.

mod json;
mod text;

pub use json::{entries_json, entry_json, health_json, verification_json};
pub use text::{print_blocks, print_entry, print_entry_list, print_health, print_verification};
