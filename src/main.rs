use clap::Parser;
use reportscraper::{run_ingest, IngestConfig, IngestError};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Ingest one vendor report into the accumulated dataset.
#[derive(Parser, Debug)]
#[command(name = "reportscraper", version, about)]
struct Args {
    /// Delimited source file to ingest
    source: PathBuf,

    /// Parse and merge in memory, report counts, write nothing
    #[arg(long)]
    dry_run: bool,

    /// TOML config file
    #[arg(long, env = "REPORTSCRAPER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the canonical dataset path
    #[arg(long)]
    canonical: Option<PathBuf>,

    /// Override the directory for previous-dataset backups
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Override the directory for raw source copies
    #[arg(long)]
    raw_backup_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reportscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    info!(source = %args.source.display(), dry_run = args.dry_run, "startup");

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &Args) -> Result<u8, IngestError> {
    // ─── 2) resolve config, CLI paths win ────────────────────────────
    let mut config = IngestConfig::resolve(args.config.as_deref()).map_err(IngestError::Config)?;
    if let Some(p) = &args.canonical {
        config.canonical_path = p.clone();
    }
    if let Some(p) = &args.backup_dir {
        config.backup_dir = p.clone();
    }
    if let Some(p) = &args.raw_backup_dir {
        config.raw_backup_dir = p.clone();
    }

    // ─── 3) ingest ───────────────────────────────────────────────────
    let summary = run_ingest(&config, &args.source, args.dry_run)?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| IngestError::Write(e.into()))?;
        println!("{}", json);
    } else {
        println!("{}", summary);
    }
    Ok(summary.exit_code())
}
