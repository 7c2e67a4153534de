//! CLI structure and command definitions

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Lakehouse platform operations CLI
#[derive(Parser, Debug)]
#[command(name = "lakectl")]
#[command(
    version,
    about = "Dispatch lakehouse platform operations with retry, batching, and profiles"
)]
#[command(long_about = "
Dispatch lakehouse platform operations with retry, batching, and profiles.

Operations are named and listed by 'lakectl ops'. Each dispatch classifies
remote failures, retries the transient ones with exponential backoff, and
assembles chunked results; batch operations fan out over a bounded pool.

EXAMPLES:
    # Configure a profile
    lakectl profile set dev --host https://ws.example.com --token TOKEN

    # List the operation catalog
    lakectl ops

    # Dispatch operations
    lakectl call list-clusters
    lakectl call get-job --data '{\"job_id\": 42}'
    lakectl call execute-statement --data @query.json -o yaml

For more help on a specific command, run:
    lakectl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "LAKECTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file (disables environment overrides)
    #[arg(long, global = true, env = "LAKECTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the retry budget for this invocation
    #[arg(long, global = true)]
    pub retry_attempts: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the operation catalog with scopes
    Ops,

    /// Dispatch one operation
    Call {
        /// Operation name, as listed by 'lakectl ops'
        operation: String,

        /// Operation arguments: inline JSON or @file
        #[arg(long, short = 'd')]
        data: Option<String>,
    },

    /// Manage configuration profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List configured profiles
    List,

    /// Show a profile (token redacted)
    Show {
        /// Profile name; defaults to the configured default
        name: Option<String>,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,

        /// Workspace deployment URL
        #[arg(long)]
        host: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,

        /// Account console URL
        #[arg(long)]
        account_host: Option<String>,

        /// Account identifier
        #[arg(long)]
        account_id: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    Remove {
        /// Profile name
        name: String,
    },
}
