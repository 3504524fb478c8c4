//! tmux command line construction

use std::path::PathBuf;

use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;

const SESSION_FORMAT: &str = "#{session_name}|#{session_windows}|#{session_created}|#{session_attached}";
const WINDOW_FORMAT: &str = "#{window_index}|#{window_name}|#{window_active}";

/// Shell operators that make a command a multi-step composite
const COMPOSITE_OPERATORS: [&str; 3] = ["&&", "||", ";"];

/// Wrap `value` in single quotes, escaping embedded single quotes
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Whether `command` chains several steps with shell operators
pub fn is_composite(command: &str) -> bool {
    COMPOSITE_OPERATORS.iter().any(|op| command.contains(op))
}

/// The shell-command argument(s) for `tmux new-session`
///
/// Composites run under a single `bash -c` and finish with `exec bash` so
/// the session stays interactive. Plain commands are passed as one quoted
/// argument, which tmux hands to the default shell.
pub fn session_command(command: Option<&str>) -> String {
    let command = command
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("bash");

    if is_composite(command) {
        format!("bash -c {}", shell_quote(&format!("{}; exec bash", command)))
    } else {
        shell_quote(command)
    }
}

/// Reject names tmux would misinterpret as targets
pub fn validate_session_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BridgeError::Validation(
            "Session name must not be empty".to_string(),
        ));
    }
    if name.contains(':') || name.contains('.') {
        return Err(BridgeError::Validation(format!(
            "Session name \"{}\" must not contain ':' or '.'",
            name
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(BridgeError::Validation(
            "Session name must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Builds tmux command lines for a given server
#[derive(Debug, Clone)]
pub struct TmuxCommands {
    binary: String,
    /// `-S` socket path, applied to local invocations only
    socket: Option<PathBuf>,
}

impl TmuxCommands {
    pub fn new(binary: impl Into<String>, socket: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            socket,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn prefix(&self, server: &ServerDefinition) -> String {
        match (&self.socket, server.is_local()) {
            (Some(socket), true) => format!(
                "{} -S {}",
                self.binary,
                shell_quote(&socket.to_string_lossy())
            ),
            _ => self.binary.clone(),
        }
    }

    pub fn version(&self, server: &ServerDefinition) -> String {
        format!("{} -V", self.prefix(server))
    }

    pub fn list_sessions(&self, server: &ServerDefinition) -> String {
        format!(
            "{} list-sessions -F {}",
            self.prefix(server),
            shell_quote(SESSION_FORMAT)
        )
    }

    /// Exact-match existence check (`=` disables tmux prefix matching)
    pub fn has_session(&self, server: &ServerDefinition, name: &str) -> String {
        format!(
            "{} has-session -t {}",
            self.prefix(server),
            shell_quote(&format!("={}", name))
        )
    }

    pub fn new_session(
        &self,
        server: &ServerDefinition,
        name: &str,
        command: Option<&str>,
    ) -> String {
        let mut line = format!(
            "{} new-session -d -s {}",
            self.prefix(server),
            shell_quote(name)
        );
        if let Some(path) = &server.default_path {
            line.push_str(&format!(" -c {}", shell_quote(path)));
        }
        line.push(' ');
        line.push_str(&session_command(command));
        line
    }

    pub fn kill_session(&self, server: &ServerDefinition, name: &str) -> String {
        format!(
            "{} kill-session -t {}",
            self.prefix(server),
            shell_quote(&format!("={}", name))
        )
    }

    pub fn list_windows(&self, server: &ServerDefinition, name: &str) -> String {
        format!(
            "{} list-windows -t {} -F {}",
            self.prefix(server),
            shell_quote(&format!("={}", name)),
            shell_quote(WINDOW_FORMAT)
        )
    }

    pub fn kill_window(&self, server: &ServerDefinition, name: &str, index: u32) -> String {
        format!(
            "{} kill-window -t {}",
            self.prefix(server),
            shell_quote(&format!("={}:{}", name, index))
        )
    }

    /// Arguments for spawning `tmux attach-session` directly (no shell)
    pub fn attach_args(&self, server: &ServerDefinition, name: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let (Some(socket), true) = (&self.socket, server.is_local()) {
            args.push("-S".to_string());
            args.push(socket.to_string_lossy().into_owned());
        }
        args.push("attach-session".to_string());
        args.push("-t".to_string());
        args.push(format!("={}", name));
        args
    }

    /// Line typed into a remote interactive shell. `exec` makes the shell
    /// exit with the tmux client, so the channel closes when the session ends.
    pub fn attach_line(&self, server: &ServerDefinition, name: &str) -> String {
        format!(
            "exec {} attach-session -t {}",
            self.prefix(server),
            shell_quote(&format!("={}", name))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servers::AuthType;

    fn remote() -> ServerDefinition {
        let mut server = ServerDefinition::local("box1");
        server.auth_type = AuthType::Password;
        server.host = Some("10.0.0.5".to_string());
        server.username = Some("root".to_string());
        server.password = Some("x".to_string());
        server
    }

    #[test]
    fn quote_escapes_embedded_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn composite_detection() {
        assert!(is_composite("cd /tmp && ls"));
        assert!(is_composite("false || true"));
        assert!(is_composite("clear; htop"));
        assert!(!is_composite("htop"));
        assert!(!is_composite("vim notes.txt"));
    }

    #[test]
    fn composite_runs_under_one_shell_and_stays_interactive() {
        for command in [
            "cd /srv && clear && claude",
            "make || echo 'build failed'",
            "echo 'it''s'; ls",
        ] {
            let wrapped = session_command(Some(command));
            let escaped = command.replace('\'', "'\\''");
            assert_eq!(wrapped, format!("bash -c '{}; exec bash'", escaped));
            assert!(wrapped.ends_with("; exec bash'"));
        }
    }

    #[test]
    fn plain_command_is_one_quoted_argument() {
        assert_eq!(session_command(Some("htop")), "'htop'");
        assert_eq!(session_command(None), "'bash'");
        assert_eq!(session_command(Some("   ")), "'bash'");
    }

    #[test]
    fn session_name_validation() {
        assert!(validate_session_name("work").is_ok());
        assert!(validate_session_name("my session").is_ok());
        assert!(validate_session_name("").is_err());
        assert!(validate_session_name("a:b").is_err());
        assert!(validate_session_name("a.b").is_err());
        assert!(validate_session_name("a\nb").is_err());
    }

    #[test]
    fn new_session_includes_default_path() {
        let commands = TmuxCommands::new("tmux", None);
        let mut server = ServerDefinition::local("Local");
        server.default_path = Some("/home/me/code".to_string());

        let line = commands.new_session(&server, "work", Some("cd src && ls"));
        assert_eq!(
            line,
            "tmux new-session -d -s 'work' -c '/home/me/code' bash -c 'cd src && ls; exec bash'"
        );
    }

    #[test]
    fn targets_use_exact_match() {
        let commands = TmuxCommands::new("tmux", None);
        let server = ServerDefinition::local("Local");
        assert_eq!(
            commands.has_session(&server, "ghost"),
            "tmux has-session -t '=ghost'"
        );
        assert_eq!(
            commands.kill_window(&server, "work", 2),
            "tmux kill-window -t '=work:2'"
        );
    }

    #[test]
    fn socket_applies_to_local_only() {
        let commands = TmuxCommands::new("tmux", Some(PathBuf::from("/tmp/tmux-0/default")));
        let local = ServerDefinition::local("Local");

        assert!(commands
            .list_sessions(&local)
            .starts_with("tmux -S '/tmp/tmux-0/default' list-sessions"));
        assert!(commands.list_sessions(&remote()).starts_with("tmux list-sessions"));
        assert_eq!(
            commands.attach_args(&local, "work"),
            vec!["-S", "/tmp/tmux-0/default", "attach-session", "-t", "=work"]
        );
        assert_eq!(
            commands.attach_args(&remote(), "work"),
            vec!["attach-session", "-t", "=work"]
        );
    }

    #[test]
    fn remote_attach_line_replaces_shell() {
        let commands = TmuxCommands::new("tmux", None);
        assert_eq!(
            commands.attach_line(&remote(), "it's"),
            "exec tmux attach-session -t '=it'\\''s'"
        );
    }
}
