//! Parsing of tmux `-F` formatted listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A tmux session as seen at query time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub name: String,
    pub windows: u32,
    /// Unix seconds
    pub created: i64,
    pub created_date: Option<DateTime<Utc>>,
    /// Whether any client is attached
    pub attached: bool,
    /// Number of attached clients
    pub attached_clients: u32,
    pub server_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub index: u32,
    pub name: String,
    pub active: bool,
}

/// Parse `name|windows|created|attached` lines
///
/// The name is taken as everything before the last three fields, so names
/// containing `|` survive. Malformed lines are skipped.
pub fn parse_sessions(output: &str, server_id: &str) -> Vec<Session> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let session = parse_session_line(line, server_id);
            if session.is_none() {
                debug!(line = %line, "Skipping unparseable session line");
            }
            session
        })
        .collect()
}

fn parse_session_line(line: &str, server_id: &str) -> Option<Session> {
    let mut fields = line.rsplitn(4, '|');
    let attached_clients: u32 = fields.next()?.trim().parse().ok()?;
    let created: i64 = fields.next()?.trim().parse().ok()?;
    let windows = fields.next()?.trim().parse().ok()?;
    let name = fields.next()?.to_string();

    Some(Session {
        name,
        windows,
        created,
        created_date: DateTime::from_timestamp(created, 0),
        attached: attached_clients > 0,
        attached_clients,
        server_id: server_id.to_string(),
    })
}

/// Parse `index|name|active` lines
pub fn parse_windows(output: &str) -> Vec<Window> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let (index, rest) = line.split_once('|')?;
            let (name, active) = rest.rsplit_once('|')?;
            Some(Window {
                index: index.trim().parse().ok()?,
                name: name.to_string(),
                active: active.trim() == "1",
            })
        })
        .collect()
}
