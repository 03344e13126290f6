use anyhow::Context;
use clap::{Parser, Subcommand};
use quarantine_scan::{PluginConfig, ScanPlugin, ScanRequest, Scanner};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// quarantine-scan: scan quarantined files with an external antivirus
/// engine
///
/// Configuration is read from the optional TOML file, then from
/// `MAL_`-prefixed environment variables (for example
/// `MAL_AVSCAN_PROGRAM_PATH` or `MAL_QUARANTINE_PATH`).
#[derive(Debug, Parser)]
#[command(about, long_about, version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "MAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan quarantined files and print one JSON result per file.
    Scan {
        /// Names of the quarantined files.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Compress a local file into the quarantine zone.
    Put {
        /// File to quarantine.
        file: PathBuf,

        /// Name to store it under; defaults to the file name.
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Exit successfully if a file is in the quarantine zone.
    Exists {
        /// Name of the quarantined file.
        name: String,
    },

    /// List quarantined files.
    List,

    /// Validate the configuration and check the scan program.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only results.
    let env_filter = EnvFilter::builder()
        .with_default_directive("info".parse()?)
        .with_env_var("MAL_LOG")
        .from_env()?;

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    let config = PluginConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let plugin = ScanPlugin::from_config(config).context("invalid configuration")?;

    match cli.command {
        Command::Scan { names } => scan(&plugin, names).await,
        Command::Put { file, name } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("cannot derive a name from {}", file.display()))?,
            };
            let contents = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            plugin.quarantine().write(&name, &contents).await?;
            println!("{name}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Exists { name } => {
            let exists = plugin.quarantine().exists(&name).await;
            println!("{exists}");
            Ok(if exists {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List => {
            for name in plugin.quarantine().list().await? {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            plugin.scanner().health_check().await?;
            info!(engine = plugin.scanner().name(), "scan plugin ready");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Scans each name in turn; Ctrl-C cancels the scan in progress and
/// skips the rest.
async fn scan(plugin: &ScanPlugin, names: Vec<String>) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let mut failed = false;
    for name in names {
        if cancel.is_cancelled() {
            break;
        }
        let request = ScanRequest::new(name);
        let result = match plugin.scanner().scan_with_cancellation(&request, &cancel).await {
            Ok(result) => result,
            Err(failure) => {
                error!(filename = %request, error = %failure.error, "scan failed");
                failed = true;
                failure.partial
            }
        };
        println!("{}", result.to_json()?);
    }

    Ok(if failed || cancel.is_cancelled() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
