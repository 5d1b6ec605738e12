use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use spendboard_api::{ApiClient, SelectedFile, UploadState, UploadWorkflow};
use spendboard_core::date_range::parse_date;
use spendboard_core::{today_in, DateRange, Feedback, Granularity, RangePreset, Severity, Snapshot};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod dashboard;
mod dashboard_state;
mod fetch_worker;
mod report;
mod state;

use config::Config;
use report::OutputFormat;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SPENDBOARD_BUILD_SHA"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "spendboard",
    version = VERSION,
    about = "Spending dashboard for bank-statement transactions"
)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend base URL (overrides SPENDBOARD_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List transactions for a date range
    Transactions {
        /// thisMonth, lastMonth or last3Months (default from config)
        #[arg(long, conflicts_with_all = ["start", "end"])]
        range: Option<RangePreset>,

        /// Custom range start, YYYY-MM-DD
        #[arg(long, requires = "end", value_parser = parse_day)]
        start: Option<NaiveDate>,

        /// Custom range end, YYYY-MM-DD (inclusive)
        #[arg(long, requires = "start", value_parser = parse_day)]
        end: Option<NaiveDate>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// KPIs, category breakdown and spending trend
    Summary {
        #[arg(long)]
        range: Option<RangePreset>,

        /// daily, weekly or monthly (default from config)
        #[arg(long)]
        view: Option<Granularity>,
    },

    /// Upload statement PDFs for extraction
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip re-reading transactions after a successful upload
        #[arg(long)]
        no_refresh: bool,
    },

    /// Check that the backend is reachable
    Health,

    /// Interactive full-screen dashboard
    Dashboard {
        #[arg(long)]
        range: Option<RangePreset>,

        #[arg(long)]
        view: Option<Granularity>,
    },

    /// Manage ~/.spendboard/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let tui = matches!(cli.command, Command::Dashboard { .. });
    init_tracing(cli.verbose, tui)?;

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let mut cfg = config::load_config()?;
                cfg.apply_api_url(cli.api_url, std::env::var(config::API_URL_ENV).ok());
                config::show_config(&cfg)?;
            }
        },

        Command::Transactions {
            range,
            start,
            end,
            format,
        } => {
            let cfg = config::effective_config(cli.api_url)?;
            let range = match (start, end) {
                (Some(s), Some(e)) => {
                    if s > e {
                        bail!("--start {s} is after --end {e}");
                    }
                    DateRange::custom(s, e)
                }
                _ => preset_range(&cfg, range)?,
            };
            cmd_transactions(&cfg, &range, format).await?;
        }

        Command::Summary { range, view } => {
            let cfg = config::effective_config(cli.api_url)?;
            let range = preset_range(&cfg, range)?;
            cmd_summary(&cfg, &range, view.unwrap_or(cfg.display.default_view)).await?;
        }

        Command::Upload { files, no_refresh } => {
            let cfg = config::effective_config(cli.api_url)?;
            cmd_upload(&cfg, files, no_refresh).await?;
        }

        Command::Health => {
            let cfg = config::effective_config(cli.api_url)?;
            let client = api_client(&cfg)?;
            let result = client.health_check().await;
            report::write_health(&mut io::stdout(), client.base_url(), &result)?;
            if !matches!(&result, Ok(h) if h.is_healthy()) {
                bail!("backend at {} is not healthy", client.base_url());
            }
        }

        Command::Dashboard { range, view } => {
            let cfg = config::effective_config(cli.api_url)?;
            let today = today_in(&cfg.display.timezone)?;
            let opts = dashboard::DashboardOptions {
                preset: range.unwrap_or(cfg.display.default_range),
                view: view.unwrap_or(cfg.display.default_view),
                today,
                timezone: cfg.display.timezone.clone(),
                currency_symbol: cfg.display.currency_symbol.clone(),
            };
            let client = api_client(&cfg)?;
            let policy = cfg.retry_policy();
            let rt = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || dashboard::run_dashboard(rt, client, policy, opts))
                .await
                .context("dashboard thread panicked")??;
        }
    }

    Ok(())
}

/// RUST_LOG > --verbose > warn. The dashboard owns the terminal, so its
/// logs go to ~/.spendboard/dashboard.log instead of stderr.
fn init_tracing(verbose: bool, tui: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    let registry = tracing_subscriber::registry().with(filter);
    if tui {
        let path = state::ensure_spendboard_home()?.join("dashboard.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(io::stderr),
            )
            .init();
    }
    Ok(())
}

fn api_client(cfg: &Config) -> Result<ApiClient> {
    ApiClient::new(&cfg.api.base_url, cfg.timeout()).context("building API client")
}

fn preset_range(cfg: &Config, preset: Option<RangePreset>) -> Result<DateRange> {
    let today = today_in(&cfg.display.timezone)?;
    Ok(preset.unwrap_or(cfg.display.default_range).resolve(today))
}

async fn fetch(cfg: &Config, range: &DateRange) -> Result<spendboard_api::TransactionList> {
    api_client(cfg)?
        .get_transactions_with_retry(range, &cfg.retry_policy())
        .await
        .with_context(|| format!("fetching transactions for {}", range.label))
}

async fn cmd_transactions(cfg: &Config, range: &DateRange, format: OutputFormat) -> Result<()> {
    let list = fetch(cfg, range).await?;

    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Table => {
            report::write_range_header(&mut out, range)?;
            writeln!(out)?;
            report::write_transactions_table(
                &mut out,
                &list.transactions,
                &cfg.display.currency_symbol,
            )?;
        }
        OutputFormat::Csv => report::write_transactions_csv(&mut out, &list.transactions)?,
        OutputFormat::Json => report::write_transactions_json(&mut out, &list)?,
    }
    Ok(())
}

async fn cmd_summary(cfg: &Config, range: &DateRange, view: Granularity) -> Result<()> {
    let list = fetch(cfg, range).await?;
    let snap = Snapshot::compute(&list.transactions, view);

    let mut out = io::stdout().lock();
    report::write_range_header(&mut out, range)?;
    writeln!(out)?;
    report::write_summary(&mut out, &snap, &cfg.display.currency_symbol)?;
    Ok(())
}

async fn cmd_upload(cfg: &Config, files: Vec<PathBuf>, no_refresh: bool) -> Result<()> {
    let selection: Vec<SelectedFile> = files.into_iter().map(SelectedFile::from_path).collect();
    let client = api_client(cfg)?;

    let mut wf = UploadWorkflow::new();
    let outcome = wf.run(&client, &selection).await.clone();

    for notice in wf.take_notices() {
        report::write_feedback(&mut io::stderr(), &notice)?;
    }

    match outcome {
        UploadState::Success(done) => {
            let mut out = io::stdout();
            report::write_feedback(&mut out, &done.feedback)?;
            writeln!(out, "Import ID: {}", done.response.import_id)?;
            writeln!(out, "{}", done.response.message)?;

            if wf.take_refetch() && !no_refresh {
                let range = preset_range(cfg, None)?;
                match fetch(cfg, &range).await {
                    Ok(list) => {
                        let snap = Snapshot::compute(&list.transactions, cfg.display.default_view);
                        writeln!(out)?;
                        report::write_range_header(&mut out, &range)?;
                        report::write_kpis(&mut out, &snap.kpis, &cfg.display.currency_symbol)?;
                    }
                    // the import itself went through
                    Err(e) => {
                        let mut fb = Feedback::transactions_failed(format!("{e:#}"));
                        fb.severity = Severity::Warning;
                        report::write_feedback(&mut io::stderr(), &fb)?;
                    }
                }
            }
            Ok(())
        }
        UploadState::Error(fb) => {
            report::write_feedback(&mut io::stderr(), &fb)?;
            bail!("{}", fb.title)
        }
        UploadState::Idle | UploadState::Uploading { .. } => bail!("no PDF files to upload"),
    }
}
