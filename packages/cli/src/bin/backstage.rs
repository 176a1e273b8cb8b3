// ABOUTME: Entry point for the backstage binary
// ABOUTME: Parses the command line, loads .env and configuration, then dispatches

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::*;

use backstage_cli::commands::{run_check_health, run_quote};
use backstage_cli::logging::init_logging;
use backstage_cli::{run_server, Config};
use backstage_core::format_clp;

#[derive(Parser)]
#[command(name = "backstage")]
#[command(about = "Backstage - consultancy back office server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Price a quote request and render its proposal PDF without a database
    Quote {
        /// JSON file with the quote selections, `cliente`, and optional `notas`
        #[arg(long)]
        request: PathBuf,
        /// Where to write the PDF
        #[arg(long)]
        out: PathBuf,
    },
    /// Run one health check for a project and record the sample
    CheckHealth {
        /// Project identifier
        project_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command.unwrap_or(Commands::Serve)).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_logging(config.log_format);

    match command {
        Commands::Serve => run_server(config).await,
        Commands::Quote { request, out } => {
            let totals = run_quote(&config, &request, &out).await?;
            println!(
                "{} {} (total {})",
                "Proposal written to".green(),
                out.display(),
                format_clp(totals.total)
            );
            Ok(())
        }
        Commands::CheckHealth { project_id } => {
            let result = run_check_health(&config, &project_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
