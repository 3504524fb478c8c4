//! Scriptable executor for tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{CommandExecutor, CommandOutput};
use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;

/// Canned reaction to a matching command
#[derive(Debug, Clone)]
pub enum MockResponse {
    Output(CommandOutput),
    /// Never signals completion; the caller's timeout fires
    Hang,
    /// Fails with a connection error
    Unreachable,
}

impl MockResponse {
    /// Successful output with the given stdout
    pub fn ok(stdout: &str) -> Self {
        MockResponse::Output(CommandOutput {
            stdout: stdout.to_string(),
            exit_status: Some(0),
            ..Default::default()
        })
    }

    /// Output with the given status and stderr
    pub fn status(code: i32, stderr: &str) -> Self {
        MockResponse::Output(CommandOutput {
            stderr: stderr.to_string(),
            exit_status: Some(code),
            ..Default::default()
        })
    }
}

struct Rule {
    server_id: Option<String>,
    needle: String,
    response: MockResponse,
}

/// Executor that answers from rules instead of running anything
///
/// The most recently added rule whose needle is a substring of the command
/// (and whose server matches, if scoped) wins. Unmatched commands succeed
/// with empty output.
#[derive(Default)]
pub struct MockExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any server's commands containing `needle`
    pub fn respond(&self, needle: &str, response: MockResponse) {
        self.push(None, needle, response);
    }

    /// Answer `server_id`'s commands containing `needle`
    pub fn respond_on(&self, server_id: &str, needle: &str, response: MockResponse) {
        self.push(Some(server_id.to_string()), needle, response);
    }

    /// Every command on `server_id` fails with a connection error
    pub fn unreachable(&self, server_id: &str) {
        self.respond_on(server_id, "", MockResponse::Unreachable);
    }

    /// Commands run so far
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, c)| c.clone()).collect())
            .unwrap_or_default()
    }

    fn push(&self, server_id: Option<String>, needle: &str, response: MockResponse) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                server_id,
                needle: needle.to_string(),
                response,
            });
        }
    }

    fn lookup(&self, server_id: &str, command: &str) -> Option<MockResponse> {
        let rules = self.rules.lock().ok()?;
        rules
            .iter()
            .rev()
            .find(|rule| {
                rule.server_id.as_deref().is_none_or(|id| id == server_id)
                    && command.contains(&rule.needle)
            })
            .map(|rule| rule.response.clone())
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn run(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((server.id.clone(), command.to_string()));
        }

        match self.lookup(&server.id, command) {
            Some(MockResponse::Output(output)) => Ok(output),
            Some(MockResponse::Hang) => {
                tokio::time::sleep(timeout).await;
                Err(BridgeError::CommandTimeout(timeout))
            }
            Some(MockResponse::Unreachable) => Err(BridgeError::Connection(format!(
                "{} is unreachable",
                server.name
            ))),
            None => Ok(CommandOutput {
                exit_status: Some(0),
                ..Default::default()
            }),
        }
    }
}
