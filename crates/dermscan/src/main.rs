use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use dermscan::cli::commands::{self, App};
use dermscan::config::{Settings, SettingsOverrides, HOME_ENV, SERVER_URL_ENV, TIMEOUT_ENV};

#[derive(Parser)]
#[command(name = "dermscan")]
#[command(
  about = "Dermscan - Skin Lesion Scan Client\nSubmit lesion photos for analysis and keep a reconcilable scan history"
)]
#[command(version)]
struct Cli {
  #[command(flatten)]
  global: GlobalArgs,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args)]
struct GlobalArgs {
  /// Directory holding the scan history and config.json
  #[arg(long, env = HOME_ENV, global = true)]
  home: Option<PathBuf>,

  /// Base URL of the scan service
  #[arg(long, env = SERVER_URL_ENV, global = true)]
  server_url: Option<String>,

  /// Request timeout in seconds
  #[arg(long, env = TIMEOUT_ENV, global = true)]
  timeout_secs: Option<u64>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand)]
enum Command {
  /// Upload a photo for analysis and save the result
  Scan {
    /// Path to the image file
    image: PathBuf,
  },
  /// List saved scans
  History {
    /// Show the score chart for each scan
    #[arg(short, long)]
    details: bool,
  },
  /// Show one saved scan
  Show {
    /// Scan ID assigned by the server
    scan_id: String,
  },
  /// Record the confirmed result for a scan
  Annotate {
    /// Scan ID assigned by the server
    scan_id: String,
    /// Confirmed diagnosis
    result: String,
  },
}

#[cfg(not(tarpaulin_include))] // Skip coverage - global subscriber setup
fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("dermscan=debug")
    } else {
      EnvFilter::new("dermscan=warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

async fn handle(cli: Cli) -> Result<()> {
  let settings = Settings::resolve(SettingsOverrides {
    data_dir: cli.global.home,
    server_url: cli.global.server_url,
    timeout_secs: cli.global.timeout_secs,
  })?;
  let app = App::from_settings(settings)?;

  match cli.command {
    Command::Scan { image } => commands::scan(&app, &image).await,
    Command::History { details } => commands::history(&app, details).await,
    Command::Show { scan_id } => commands::show(&app, &scan_id).await,
    Command::Annotate { scan_id, result } => commands::annotate(&app, &scan_id, &result).await,
  }
}

#[cfg(not(tarpaulin_include))] // Skip coverage - process entry and exit
#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  init_logging(cli.global.verbose);

  if let Err(e) = handle(cli).await {
    eprintln!("{} {:#}", "✗".red(), e);
    std::process::exit(1);
  }
}
