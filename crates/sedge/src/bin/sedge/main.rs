mod cli;

use anyhow::Context;
use sedge::document::Document;
use sedge::fetch::ContentFetcher;
use sedge::keys::ScannedKeyLibrary;
use sedge::output::Output;
use std::path::PathBuf;

/// Written by `sedge init`
const STARTER_CONFIG: &str = include_str!("starter.sedge");

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SEDGE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let command_result = match &cli.command {
        cli::Command::Update => update(&cli),
        cli::Command::Init => init(&cli),
        cli::Command::Keys(keys_cli) => keys(&cli, keys_cli),
        cli::Command::Dev(dev_cli) => dev(&cli, dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn home_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir().context("Unable to determine the home directory")
}

fn config_file(cli: &cli::Cli) -> anyhow::Result<PathBuf> {
    match &cli.config_file {
        Some(path) => Ok(path.clone()),
        None => Ok(home_dir()?.join(".sedge").join("config")),
    }
}

fn output_file(cli: &cli::Cli) -> anyhow::Result<PathBuf> {
    match &cli.output_file {
        Some(path) => Ok(path.clone()),
        None => Ok(home_dir()?.join(".ssh").join("config")),
    }
}

fn key_directory(cli: &cli::Cli) -> anyhow::Result<PathBuf> {
    match &cli.key_directory {
        Some(path) => Ok(path.clone()),
        None => Ok(home_dir()?.join(".ssh")),
    }
}

/// Render the config file and write the result over the ssh config
pub fn update(cli: &cli::Cli) -> anyhow::Result<()> {
    let output = render(cli)?;
    let output_file = output_file(cli)?;

    // written next to the target, then moved into place
    let mut partial = output_file.clone().into_os_string();
    partial.push(".sedge-new");
    let partial = PathBuf::from(partial);

    std::fs::write(&partial, output.to_string())
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, &output_file)
        .with_context(|| format!("Failed to replace {}", output_file.display()))?;

    tracing::info!(
        path = %output_file.display(),
        stanzas = output.stanzas().len(),
        "ssh config written"
    );

    if let Err(err) = write_hosts(&output) {
        tracing::warn!("~/.sedge/hosts could not be written: {err:#}");
    }

    Ok(())
}

/// Host names for shell completion, one per line
fn write_hosts(output: &Output) -> anyhow::Result<()> {
    let path = home_dir()?.join(".sedge").join("hosts");

    let mut hosts = String::new();
    for host in output.completion_hosts() {
        hosts.push_str(host);
        hosts.push('\n');
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, hosts)?;
    Ok(())
}

/// Create a starter config file, never overwrites
pub fn init(cli: &cli::Cli) -> anyhow::Result<()> {
    use std::io::Write;

    let path = config_file(cli)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            println!("{} already exists, leaving it untouched", path.display());
            return Ok(());
        }
        Err(err) => {
            return Err(anyhow::Error::from(err).context(format!("Failed to create {}", path.display())))
        }
    };

    file.write_all(STARTER_CONFIG.as_bytes())?;
    println!("Created {}", path.display());
    Ok(())
}

pub fn keys(cli: &cli::Cli, keys_cli: &cli::KeysCommand) -> anyhow::Result<()> {
    let directory = key_directory(cli)?;
    let library = ScannedKeyLibrary::scan(&directory);

    match keys_cli.command {
        cli::KeysSubCommand::List => {
            let keys = library.keys();
            let width = keys
                .iter()
                .map(|(fingerprint, _)| fingerprint.len())
                .max()
                .unwrap_or(0);
            for (fingerprint, path) in keys {
                println!("{fingerprint:>width$}  {}", path.display());
            }
        }
        cli::KeysSubCommand::Add => {
            let files = library.key_files();
            anyhow::ensure!(!files.is_empty(), "No keys found in {}", directory.display());

            let status = std::process::Command::new("ssh-add")
                .args(files)
                .status()
                .context("Failed to run ssh-add")?;
            anyhow::ensure!(status.success(), "ssh-add failed ({status})");
        }
    }

    Ok(())
}

fn load(cli: &cli::Cli) -> anyhow::Result<Document> {
    let path = config_file(cli)?;
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let fetcher = ContentFetcher::new(!cli.no_verify)?;
    let document = Document::parse(&text, path.display().to_string(), &fetcher)?;
    Ok(document)
}

fn render(cli: &cli::Cli) -> anyhow::Result<Output> {
    let document = load(cli)?;
    let keys = ScannedKeyLibrary::scan(key_directory(cli)?);
    let output = sedge::output::render(&document, &keys)?;
    Ok(output)
}

/// (sedge-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: &cli::Cli, dev_cli: &cli::DevCommand) -> anyhow::Result<()> {
    match &dev_cli.command {
        cli::DevSubCommand::Document => println!("{:#?}", load(cli)?),
        cli::DevSubCommand::Stanzas(output_args) => {
            let output = render(cli)?;
            match output_args.format {
                cli::OutputFormat::Ssh => print!("{output}"),
                cli::OutputFormat::Json => {
                    serde_json::to_writer_pretty(std::io::stdout(), output.stanzas())?
                }
                cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), output.stanzas())?,
            }
        }
    }

    Ok(())
}
