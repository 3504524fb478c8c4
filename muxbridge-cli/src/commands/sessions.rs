//! Sessions inspection commands

use anyhow::Result;
use clap::{Args, Subcommand};
use muxbridge_core::Session;

use crate::client::{DEFAULT_URL, DaemonClient};

/// Sessions inspection arguments
#[derive(Args, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommands,

    /// Daemon base URL
    #[arg(long, global = true, default_value = DEFAULT_URL)]
    pub url: String,
}

/// Sessions subcommands
#[derive(Subcommand, Debug)]
pub enum SessionsCommands {
    /// List tmux sessions
    List {
        /// Only this server (default: every registered server)
        #[arg(long)]
        server: Option<String>,
    },
}

/// Run sessions command
pub async fn run(args: SessionsArgs) -> Result<()> {
    let client = DaemonClient::new(&args.url);
    match args.command {
        SessionsCommands::List { server } => {
            let sessions = client.list_sessions(server.as_deref()).await?;
            if sessions.is_empty() {
                println!("No active sessions");
                return Ok(());
            }
            println!("Active sessions:");
            println!();
            for session in &sessions {
                println!("{}", format_session(session));
            }
            Ok(())
        }
    }
}

fn format_session(session: &Session) -> String {
    let created = session
        .created_date
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let attached = if session.attached { " (attached)" } else { "" };
    format!(
        "  {}/{} - {} window(s), created {}{}",
        session.server_id, session.name, session.windows, created, attached
    )
}
