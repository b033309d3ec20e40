use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use strongbox_core::VERSION;

/// Strongbox - an offline, encrypted journal with a tamper-evident audit chain
#[derive(Parser)]
#[command(name = "strongbox")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the vault database
    #[arg(long, global = true, env = "STRONGBOX_VAULT", value_name = "PATH")]
    pub vault: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Path where the vault will be created
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

/// Arguments for the `add` command
#[derive(Args)]
pub struct AddArgs {
    /// Entry text (read from stdin otherwise)
    #[arg(long)]
    pub body: Option<String>,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the N newest entries
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Entry ID
    #[arg(value_name = "ID")]
    pub id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

/// Arguments for the `verify` command
#[derive(Args)]
pub struct VerifyArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with an error if any block fails verification
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `log` command
#[derive(Args)]
pub struct LogArgs {
    /// Show the N most recent blocks
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `export` command
#[derive(Args)]
pub struct ExportArgs {
    /// Directory to write into (defaults to config or the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Base file name, without extension
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

/// Arguments for the `check` command
#[derive(Args)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip unlocking; entry MACs are not checked
    #[arg(long)]
    pub no_unlock: bool,
}

/// Arguments for the `wipe` command
#[derive(Args)]
pub struct WipeArgs {
    /// Confirm the wipe without prompting
    #[arg(long)]
    pub yes: bool,

    /// Also remove the audit log (no wipe event is recorded)
    #[arg(long)]
    pub include_audit: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Arguments for the `biometric` command
#[derive(Args)]
pub struct BiometricArgs {
    #[arg(value_enum)]
    pub state: Toggle,

    /// Disable interactive prompts
    #[arg(long)]
    pub no_input: bool,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new vault
    Init(InitArgs),

    /// Encrypt and add a journal entry
    Add(AddArgs),

    /// List entries (metadata only, nothing is decrypted)
    List(ListArgs),

    /// Decrypt and show an entry by ID
    Show(ShowArgs),

    /// Verify the audit chain
    Verify(VerifyArgs),

    /// Print the audit chain head fingerprint
    Head,

    /// Show audit chain blocks
    Log(LogArgs),

    /// Export the audit chain as JSONL with a manifest
    Export(ExportArgs),

    /// Check vault integrity (storage, entries, audit chain)
    Check(CheckArgs),

    /// Destroy all entries and key material
    Wipe(WipeArgs),

    /// Turn the biometric gate on or off
    Biometric(BiometricArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
