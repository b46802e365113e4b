use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sqlgate",
    version,
    about = "Check SQL statements against an SQLite authorization policy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Prepare statements under a policy and report every authorization request
    Check(CheckArgs),
    /// List the authorizer action catalog
    Actions(ActionsArgs),
    /// Load a config file and report problems
    Validate(ValidateArgs),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Policy config. Everything is allowed when omitted.
    #[arg(long, env = "SQLGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file. An in-memory database is used when omitted.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// SQL script run before the authorizer is installed
    #[arg(long)]
    pub init: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Statements to prepare (one statement per argument)
    #[arg(required = true)]
    pub sql: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ActionsArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[arg(long, env = "SQLGATE_CONFIG", default_value = "sqlgate.yaml")]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
