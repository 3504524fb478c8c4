use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "muxbridge", about = "Browser access to local and remote tmux sessions")]
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
    /// Run the muxbridge server
    Serve(commands::serve::ServeArgs),
    /// Inspect registered servers on a running daemon
    Servers(commands::servers::ServersArgs),
    /// Inspect tmux sessions on a running daemon
    Sessions(commands::sessions::SessionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Servers(args) => commands::servers::run(args).await,
        Commands::Sessions(args) => commands::sessions::run(args).await,
    }
}
