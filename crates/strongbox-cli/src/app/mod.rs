//! Application-level plumbing for the Strongbox CLI.
//!
//! - Path resolution for the config file and the vault
//! - Opening the vault with settings from config
//! - Unlocking with passphrase retry
//! - The presence check used as the biometric gate

mod context;
mod gate;
mod resolver;
mod unlock;

pub use context::AppContext;
pub use resolver::resolve_config_path;
