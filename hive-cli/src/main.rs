use anyhow::Result;
use clap::{Parser, Subcommand};

mod builtin;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "hive", about = "Restore, load and run extension packages")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Restore and load all stored packages
    Load,
    /// Manage package references
    Refs(commands::refs::RefsArgs),
    /// Instantiate an extension and print its description
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Load => commands::load::run().await,
        Commands::Refs(args) => commands::refs::run(args).await,
        Commands::Run(args) => commands::run::run(args).await,
    }
}
