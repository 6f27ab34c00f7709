use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use feedmail::config::Config;
use feedmail::feed::HttpFetcher;
use feedmail::notify::SendmailNotifier;
use feedmail::storage::{Database, DatabaseError};
use feedmail::{Mode, Pipeline, StartError, USAGE};

/// Get the config directory path (~/.config/feedmail/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedmail"))
}

#[derive(Parser, Debug)]
#[command(name = "feedmail", about = "Mail new RSS/Atom entries to a list of recipients")]
struct Args {
    /// Config file (default: ~/.config/feedmail/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mail each new entry, then repeat every 15 minutes. Never exits.
    Daemon(MailArgs),
    /// Mail each new entry once, then exit
    Cron(MailArgs),
    /// Print the configured feeds
    List,
    /// Print the entries already mailed for a feed
    Seen {
        /// Feed URL as written in the config file
        feed: String,
    },
}

#[derive(clap::Args, Debug)]
struct MailArgs {
    /// Print progress and the sleep notice to stdout
    #[arg(long)]
    verbose: bool,

    /// Recipient addresses
    #[arg(value_name = "EMAIL")]
    recipients: Vec<String>,
}

/// Config file in use and the directory relative paths resolve against.
///
/// `HOME` is only consulted when `--config` is absent.
fn config_paths(config: Option<PathBuf>) -> Result<(PathBuf, PathBuf)> {
    let config_path = match config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config_dir = match config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };
    Ok((config_path, config_dir))
}

async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: Another instance of feedmail appears to be running.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

/// Load config, open the store and build the real collaborators.
async fn build_pipeline(config: Option<PathBuf>) -> Result<Pipeline> {
    let (config_path, config_dir) = config_paths(config)?;
    let config = Config::load(&config_path).context("Failed to load config")?;
    let feeds = config.validated_feeds().context("Invalid feed configuration")?;

    let db = open_database(&config.database_path(&config_dir)).await?;
    let client = reqwest::Client::builder()
        .user_agent(concat!("feedmail/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(Pipeline {
        fetcher: Box::new(HttpFetcher::new(
            client,
            Duration::from_secs(config.fetch_timeout_secs),
        )),
        notifier: Box::new(SendmailNotifier::new(&config.sendmail, &config.from)),
        store: Box::new(db),
        feeds,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for user-facing output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mode = match args.command {
        Command::Daemon(_) => Mode::Forever,
        _ => Mode::Once,
    };
    match args.command {
        Command::Daemon(mail) | Command::Cron(mail) => {
            let config = args.config;
            match feedmail::start(mail.recipients, mail.verbose, mode, || build_pipeline(config))
                .await
            {
                Ok(_) => Ok(()),
                Err(StartError::Usage(e)) => {
                    tracing::debug!(error = %e, "Rejected recipient arguments");
                    println!("{}", USAGE);
                    std::process::exit(1);
                }
                Err(StartError::Setup(e)) => Err(e),
            }
        }
        Command::List => {
            let (config_path, _) = config_paths(args.config)?;
            let config = Config::load(&config_path).context("Failed to load config")?;
            for feed in config.validated_feeds().context("Invalid feed configuration")? {
                println!("{}", feed);
            }
            Ok(())
        }
        Command::Seen { feed } => {
            let (config_path, config_dir) = config_paths(args.config)?;
            let config = Config::load(&config_path).context("Failed to load config")?;
            let db = open_database(&config.database_path(&config_dir)).await?;
            let entries = db
                .seen_for_feed(feed.trim())
                .await
                .context("Failed to read seen entries")?;
            for entry in entries {
                let when = Utc
                    .timestamp_opt(entry.notified_at, 0)
                    .single()
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default();
                println!("{}\t{}", when, entry.guid);
            }
            db.close().await;
            Ok(())
        }
    }
}
