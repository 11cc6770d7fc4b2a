use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use receipt_client::session::PREVIEW_FAILED;
use receipt_client::{Session, WebhookClient, preview_receipt, select_store, subscribe};
use receipt_ingest::load_image;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod state;

use config::Config;
use render::OutputFormat;
use state::env_var;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RECEIPT_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "receipt",
    version,
    long_version = LONG_VERSION,
    about = "Submit receipt images and reconcile the returned expenses"
)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a receipt image and print the consolidated expense list
    Submit {
        /// Receipt image (jpg, png, webp, heic, ...)
        file: PathBuf,

        /// Run the AI preview before uploading
        #[arg(long)]
        preview: bool,

        /// Override the configured webhook endpoint
        #[arg(long)]
        webhook_url: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// AI preview only: extract fields and store the guess
    Preview {
        file: PathBuf,
    },

    /// List the most recent stored records
    Recent {
        /// Number of records (default: [store] recent_limit)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Follow the record store, printing each change
    Watch {
        #[arg(long)]
        limit: Option<usize>,

        /// Poll interval in seconds
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Stop after this many snapshots
        #[arg(long)]
        ticks: Option<usize>,
    },

    /// Manage ~/.receipt/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Submit {
            file,
            preview,
            webhook_url,
            format,
        } => {
            let cfg = config::load_config()?;
            submit(&cfg, file, preview, webhook_url, format).await?;
        }

        Command::Preview { file } => {
            let cfg = config::load_config()?;
            preview(&cfg, file).await?;
        }

        Command::Recent { limit, format } => {
            let cfg = config::load_config()?;
            let store = select_store(cfg.firestore_config(env_var));
            let limit = limit.unwrap_or(cfg.store.recent_limit);
            let records = store
                .recent(limit)
                .await
                .with_context(|| format!("reading recent records from {} store", store.kind()))?;
            let snap = receipt_client::Snapshot::from_records(records);
            render::render_snapshot(&snap, &cfg.display.currency, format, &mut io::stdout())?;
            if store.kind() == "memory" {
                eprintln!("\n({})", config::NO_STORE_HINT);
            }
        }

        Command::Watch {
            limit,
            interval,
            ticks,
        } => {
            let cfg = config::load_config()?;
            let store = select_store(Some(cfg.require_firestore(env_var)?));
            let limit = limit.unwrap_or(cfg.store.recent_limit);
            let mut sub = subscribe(store, limit, Duration::from_secs(interval.max(1)));

            let mut seen = 0usize;
            while let Some(snap) = sub.changed().await {
                println!("--- {} record(s)", snap.records.len());
                render::render_snapshot(&snap, &cfg.display.currency, OutputFormat::Table, &mut io::stdout())?;
                seen += 1;
                if ticks.is_some_and(|t| seen >= t) {
                    break;
                }
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "receipt=debug,receipt_client=debug,receipt_ingest=debug"
    } else {
        "receipt=info,receipt_client=info,receipt_ingest=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .init();
}

fn build_session(cfg: &Config, webhook_url: Option<String>) -> Result<Session> {
    let Some(url) = cfg.webhook_url(webhook_url, env_var) else {
        bail!(
            "No webhook endpoint configured. Set [webhook] url in {}, export {}, or pass --webhook-url",
            config::config_path()?.display(),
            config::WEBHOOK_URL_ENV
        );
    };
    debug!(%url, "using webhook endpoint");

    let webhook = WebhookClient::new(url, cfg.webhook_timeout()).context("building HTTP client")?;
    let store = select_store(cfg.firestore_config(env_var));
    let mut session = Session::new(webhook, store, cfg.display.currency.clone());
    if let Some(extractor) = cfg.extraction_client(env_var) {
        session = session.with_extractor(extractor);
    }
    Ok(session)
}

async fn submit(
    cfg: &Config,
    file: PathBuf,
    preview: bool,
    webhook_url: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let image = load_image(&file)?;
    let mut session = build_session(cfg, webhook_url)?;
    session.select(image);

    if preview {
        run_preview(&mut session, cfg).await?;
    }

    eprintln!("Data processing: uploading {}…", file.display());
    if let Err(e) = session.submit().await {
        bail!("{e}");
    }

    render::render_state(session.state(), format, &mut io::stdout())?;
    if let Some(notice) = session.notice() {
        eprintln!("\n{notice}");
    }
    Ok(())
}

async fn preview(cfg: &Config, file: PathBuf) -> Result<()> {
    let image = load_image(&file)?;
    let Some(extractor) = cfg.extraction_client(env_var) else {
        bail!(
            "AI preview not configured (enable [extraction] and export {})",
            cfg.extraction.api_key_env
        );
    };
    let store = select_store(cfg.firestore_config(env_var));

    let guess = match preview_receipt(&extractor, store.as_ref(), &image).await {
        Ok(guess) => guess,
        Err(e) => bail!("{PREVIEW_FAILED} ({e})"),
    };
    render::render_guess(&guess, &mut io::stdout())?;
    if store.kind() == "memory" {
        eprintln!("({})", config::NO_STORE_HINT);
    }
    Ok(())
}

async fn run_preview(session: &mut Session, cfg: &Config) -> Result<()> {
    if cfg.extraction_client(env_var).is_none() {
        eprintln!(
            "AI preview not configured (enable [extraction] and export {}); skipping",
            cfg.extraction.api_key_env
        );
        return Ok(());
    }

    match session.preview().await {
        Some(guess) => render::render_guess(&guess, &mut io::stdout())?,
        None => {
            if let Some(notice) = session.notice() {
                eprintln!("{notice}");
            }
        }
    }
    Ok(())
}
