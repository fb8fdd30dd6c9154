//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hostvar_domain::{ReplacementTrigger, ThemeMode};

/// Hostvar - host-scoped `{{placeholder}}` variables
#[derive(Debug, Parser)]
#[command(name = "hostvar")]
#[command(version)]
#[command(about = "Manage host-scoped placeholder variables and resolve them in text")]
pub struct Cli {
    /// Path of the storage file
    #[arg(long, env = "HOSTVAR_DATA", value_name = "FILE", global = true)]
    pub data: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the storage file if it does not exist
    Init,

    /// List variables, optionally only those visible on an origin
    List {
        /// Only show variables visible on this origin (`host[:port]` or URL)
        #[arg(long, value_name = "ORIGIN")]
        origin: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the value of a variable
    Get {
        /// Variable key
        key: String,
    },

    /// Create or update a variable by key
    Set(SetArgs),

    /// Delete a variable by key
    #[command(alias = "rm")]
    Delete {
        /// Variable key
        key: String,
    },

    /// Delete every variable
    Clear,

    /// Search keys, values and descriptions
    Search {
        /// Case-insensitive search text
        query: String,
    },

    /// Write the variables as an export document
    Export {
        /// Write a full backup (settings and ids included)
        #[arg(long)]
        full: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Load variables from an export document
    Import {
        /// Input file (stdin if omitted or `-`)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Add to existing variables instead of replacing them
        #[arg(long, conflicts_with = "full")]
        merge: bool,

        /// Restore a full backup
        #[arg(long)]
        full: bool,
    },

    /// Replace placeholders in text for an origin
    Resolve {
        /// Origin the text is used on (`host[:port]` or URL)
        #[arg(long, value_name = "ORIGIN")]
        origin: String,

        /// Text to resolve (stdin if omitted)
        text: Option<String>,
    },

    /// Show or change settings
    Settings {
        /// Settings action (shows settings if omitted)
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Flip the global substitution switch
    Toggle,

    /// Show storage usage
    Stats,

    /// Handle one JSON protocol message (stdin if omitted)
    Message {
        /// Message JSON, e.g. `{"type":"GET_VARIABLES"}`
        json: Option<String>,
    },
}

/// Arguments of `hostvar set`.
#[derive(Debug, Args)]
pub struct SetArgs {
    /// Variable key
    pub key: String,

    /// Replacement value
    pub value: String,

    /// Free-text description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Restrict to a host pattern (repeatable; none means global)
    #[arg(long = "host", value_name = "PATTERN")]
    pub hosts: Vec<String>,

    /// Store the variable disabled
    #[arg(long)]
    pub disabled: bool,
}

/// Settings subcommands.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Show current settings
    Show,

    /// Update individual settings
    Set {
        /// Turn substitution on or off
        #[arg(long)]
        enabled: Option<bool>,

        /// Theme preference
        #[arg(long, value_parser = parse_theme)]
        theme: Option<ThemeMode>,

        /// When page integrations substitute
        #[arg(long, value_parser = parse_trigger)]
        trigger: Option<ReplacementTrigger>,

        /// Shortcut label
        #[arg(long)]
        shortcut: Option<String>,

        /// Case-sensitive matching preference
        #[arg(long)]
        case_sensitive: Option<bool>,
    },

    /// Restore default settings
    Reset,
}

fn parse_theme(value: &str) -> Result<ThemeMode, String> {
    value.parse().map_err(|e: hostvar_domain::ParseSettingError| e.to_string())
}

fn parse_trigger(value: &str) -> Result<ReplacementTrigger, String> {
    value.parse().map_err(|e: hostvar_domain::ParseSettingError| e.to_string())
}
