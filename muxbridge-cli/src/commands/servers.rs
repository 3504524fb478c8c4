//! Server registry inspection

use anyhow::Result;
use clap::{Args, Subcommand};
use muxbridge_core::ServerView;

use crate::client::{DEFAULT_URL, DaemonClient};

#[derive(Args, Debug)]
pub struct ServersArgs {
    #[command(subcommand)]
    pub command: ServersCommands,

    /// Daemon base URL
    #[arg(long, global = true, default_value = DEFAULT_URL)]
    pub url: String,
}

#[derive(Subcommand, Debug)]
pub enum ServersCommands {
    /// List registered servers
    List,
}

pub async fn run(args: ServersArgs) -> Result<()> {
    let client = DaemonClient::new(&args.url);
    match args.command {
        ServersCommands::List => {
            let servers = client.list_servers().await?;
            if servers.is_empty() {
                println!("No servers registered");
            }
            for server in &servers {
                println!("{}", format_server(server));
            }
            Ok(())
        }
    }
}

fn format_server(server: &ServerView) -> String {
    let target = if server.auth_type.is_local() {
        "local".to_string()
    } else {
        format!(
            "{}@{}:{}",
            server.username.as_deref().unwrap_or("?"),
            server.host.as_deref().unwrap_or("?"),
            server.port
        )
    };
    let marker = if server.is_default { " (default)" } else { "" };
    format!("  {} - {} [{}]{}", server.id, server.name, target, marker)
}
