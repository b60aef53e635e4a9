//! # soptrack CLI entry point
//!
//! Parses command-line arguments, opens the database, and dispatches to
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use soptrack_cli::accounts::{run_create_user, CreateUserArgs};
use soptrack_cli::compliance::{run_compliance, ComplianceArgs};
use soptrack_cli::export::{run_export, ExportArgs};
use soptrack_cli::import::{run_import_sops, run_import_staff, ImportSopsArgs, ImportStaffArgs};

/// SOPTrack operator CLI.
#[derive(Parser, Debug)]
#[command(name = "soptrack", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// SQLite database URL.
    #[arg(
        long,
        global = true,
        env = "SOPTRACK_DATABASE_URL",
        default_value = soptrack_api::config::DEFAULT_DATABASE_URL
    )]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a directory of SOP documents.
    ImportSops(ImportSopsArgs),

    /// Import a staff roster CSV.
    ImportStaff(ImportStaffArgs),

    /// Create a login account.
    CreateUser(CreateUserArgs),

    /// Write a CSV export.
    Export(ExportArgs),

    /// Print the compliance report.
    Compliance(ComplianceArgs),
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let pool = soptrack_cli::open_database(&cli.database_url).await?;
    let mut out = std::io::stdout().lock();
    match &cli.command {
        Commands::ImportSops(args) => run_import_sops(args, &pool, &mut out).await,
        Commands::ImportStaff(args) => run_import_staff(args, &pool, &mut out).await,
        Commands::CreateUser(args) => run_create_user(args, &pool, &mut out).await,
        Commands::Export(args) => run_export(args, &pool, &mut out).await,
        Commands::Compliance(args) => run_compliance(args, &pool, &mut out).await,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
