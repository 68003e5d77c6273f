//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Interactive shell for Flink SQL statements.
#[derive(Parser, Debug, Clone)]
#[command(name = "flink-shell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file.
    #[arg(short, long, env = "FLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Statement service URL.
    #[arg(short, long, env = "FLINK_GATEWAY")]
    pub gateway: Option<String>,

    /// API token sent as a bearer token.
    #[arg(long, env = "FLINK_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Organization that owns the statements.
    #[arg(long, env = "FLINK_ORGANIZATION")]
    pub organization: Option<String>,

    /// Environment that owns the statements.
    #[arg(long, env = "FLINK_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Compute pool that runs the statements.
    #[arg(long, env = "FLINK_COMPUTE_POOL")]
    pub compute_pool: Option<String>,

    /// Principal to run statements as.
    #[arg(long, env = "FLINK_PRINCIPAL")]
    pub principal: Option<String>,

    /// Initial catalog.
    #[arg(long)]
    pub catalog: Option<String>,

    /// Initial database.
    #[arg(long)]
    pub database: Option<String>,

    /// Initial session property (repeatable).
    #[arg(short = 'D', long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Run the statements of a file and exit.
    #[arg(short, long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Run the given statements and exit.
    #[arg(short, long)]
    pub execute: Option<String>,

    /// Wait for non-query statements to finish.
    #[arg(long)]
    pub wait: bool,

    /// Do not record statement history.
    #[arg(long)]
    pub no_history: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Split a `KEY=VALUE` argument.
pub fn parse_property(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
}
