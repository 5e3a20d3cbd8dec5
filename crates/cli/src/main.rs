use clap::{Parser, Subcommand};

mod commands;

use commands::{IndicatorsArgs, PositionsArgs, ReplayArgs, RunArgs};

#[derive(Parser)]
#[command(name = "zdte")]
#[command(about = "QQQ 0DTE SMA9/VWAP crossover engine", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live engine against the brokerage until Ctrl-C
    Run(RunArgs),
    /// Drive the engine minute-by-minute over recorded bars and quotes
    Replay(ReplayArgs),
    /// Print SMA9, VWAP and crossovers for a bar file
    Indicators(IndicatorsArgs),
    /// List open and recent positions from Postgres
    Positions(PositionsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    match cli.command {
        Commands::Run(args) => commands::run_engine(args).await?,
        Commands::Replay(args) => commands::run_replay(args).await?,
        Commands::Indicators(args) => commands::run_indicators(args)?,
        Commands::Positions(args) => commands::run_positions(args).await?,
    }

    Ok(())
}
