//! sedge cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// sedge configuration to read [default: ~/.sedge/config]
    #[clap(short = 'c', long = "config-file", global(true))]
    pub config_file: Option<PathBuf>,

    /// ssh config to write [default: ~/.ssh/config]
    #[clap(short = 'o', long = "output-file", global(true))]
    pub output_file: Option<PathBuf>,

    /// Do not verify TLS certificates of https:// includes
    #[clap(short = 'n', long = "no-verify", global(true))]
    pub no_verify: bool,

    /// Directory to scan for SSH keys [default: ~/.ssh]
    #[clap(short = 'k', long = "key-directory", global(true))]
    pub key_directory: Option<PathBuf>,

    /// Log progress to stderr
    ///
    /// SEDGE_LOG takes precedence (e.g. SEDGE_LOG=sedge=trace)
    #[clap(short = 'v', long = "verbose", global(true))]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the sedge config into the ssh config
    Update,

    /// Initialise the sedge config file if none exists
    Init,

    /// Manage ssh keys
    Keys(KeysCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct KeysCommand {
    #[command(subcommand)]
    pub command: KeysSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum KeysSubCommand {
    /// List the keys found in the key directory
    List,

    /// Add every key found in the key directory to the ssh agent
    Add,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Ssh,
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Ssh => f.write_str("ssh"),
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// The parsed document tree
    Document,

    /// The rendered stanzas
    Stanzas(OutputArgs),
}
