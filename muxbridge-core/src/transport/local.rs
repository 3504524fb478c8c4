//! Local attach through a pseudoterminal

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::traits::{CloseReason, EVENT_BUFFER, OpenedTransport, TermSize, Transport, TransportEvent};
use super::TransportError;

const READ_CHUNK: usize = 4096;
const REAP_POLL: Duration = Duration::from_millis(20);

/// The attach process and, once reaped, its exit code
///
/// Reaping and signalling both happen under this lock, so a pid is never
/// signalled after it has been reaped.
struct ChildSlot {
    child: Box<dyn Child + Send + Sync>,
    exited: Option<u32>,
}

/// `tmux attach-session` running in a local PTY
pub struct LocalPtyTransport {
    master: Mutex<Box<dyn MasterPty + Send>>,
    /// Queue drained by the `pty-writer` thread
    input: mpsc::UnboundedSender<Vec<u8>>,
    child: Arc<Mutex<ChildSlot>>,
    pid: Option<u32>,
    closed: AtomicBool,
}

impl LocalPtyTransport {
    /// Spawn `program args..` in a PTY of the given size
    ///
    /// The child inherits this process's environment (minus `TMUX`, so
    /// tmux does not refuse to nest) and working directory.
    pub fn spawn(
        program: &str,
        args: &[String],
        size: TermSize,
    ) -> Result<OpenedTransport, TransportError> {
        let (transport, events) = Self::start(program, args, size)?;
        Ok(OpenedTransport {
            transport: Box::new(transport),
            events,
        })
    }

    fn start(
        program: &str,
        args: &[String],
        size: TermSize,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), TransportError> {
        info!(program = %program, args = ?args, cols = size.cols, rows = size.rows, "Spawning local attach");

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(size))
            .map_err(|e| TransportError::SpawnFailed(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.env("TERM", "xterm-256color");
        cmd.env_remove("TMUX");
        cmd.cwd(working_dir());

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TransportError::SpawnFailed(e.to_string()))?;
        // The reader only sees EOF once every slave handle is gone
        drop(pair.slave);

        let pid = child.process_id();
        let child = Arc::new(Mutex::new(ChildSlot {
            child,
            exited: None,
        }));
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reaper = Arc::clone(&child);
        std::thread::Builder::new()
            .name("pty-reader".to_string())
            .spawn(move || read_loop(reader, &reaper, tx))?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("pty-writer".to_string())
            .spawn(move || write_loop(writer, input_rx))?;

        let transport = Self {
            master: Mutex::new(pair.master),
            input: input_tx,
            child,
            pid,
            closed: AtomicBool::new(false),
        };
        Ok((transport, rx))
    }

    /// SIGKILL the tmux client unless it has already exited
    ///
    /// portable-pty's own killer sends SIGHUP, which tmux can forward into
    /// the session; SIGKILL only ends the client and leaves the session.
    /// Returns whether a signal was sent.
    fn kill(&self) -> bool {
        let Ok(mut slot) = self.child.lock() else {
            return false;
        };
        if slot.exited.is_some() {
            return false;
        }
        if let Ok(Some(status)) = slot.child.try_wait() {
            slot.exited = Some(status.exit_code());
            return false;
        }

        #[cfg(unix)]
        if let Some(pid) = self.pid {
            // SAFETY: the child is unreaped and stays so while the slot is locked
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
            if rc == 0 {
                return true;
            }
        }
        match slot.child.kill() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Attach process already gone");
                false
            }
        }
    }
}

fn pty_size(size: TermSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn working_dir() -> PathBuf {
    std::env::current_dir()
        .ok()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/root"))
}

fn read_loop(
    mut reader: Box<dyn Read + Send>,
    child: &Mutex<ChildSlot>,
    tx: mpsc::Sender<TransportEvent>,
) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(TransportEvent::Data(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            // EIO once the child side hangs up
            Err(_) => break,
        }
    }

    let reason = reap(child);
    debug!(reason = %reason, "Local attach finished");
    let _ = tx.blocking_send(TransportEvent::Closed(reason));
}

/// Wait for the child without holding the slot lock across a blocking wait
fn reap(child: &Mutex<ChildSlot>) -> CloseReason {
    loop {
        {
            let Ok(mut slot) = child.lock() else {
                return CloseReason::Failed("attach process state poisoned".to_string());
            };
            if let Some(code) = slot.exited {
                return CloseReason::Exited(Some(code));
            }
            match slot.child.try_wait() {
                Ok(Some(status)) => {
                    let code = status.exit_code();
                    slot.exited = Some(code);
                    return CloseReason::Exited(Some(code));
                }
                Ok(None) => {}
                Err(e) => return CloseReason::Failed(e.to_string()),
            }
        }
        std::thread::sleep(REAP_POLL);
    }
}

/// Drain queued input into the PTY; blocking writes stay off the runtime
fn write_loop(mut writer: Box<dyn Write + Send>, mut input: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(data) = input.blocking_recv() {
        if let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) {
            debug!(error = %e, "PTY writer stopped");
            break;
        }
    }
}

#[async_trait]
impl Transport for LocalPtyTransport {
    async fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Ok(());
        }
        self.input
            .send(data.to_vec())
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn resize(&self, size: TermSize) -> Result<(), TransportError> {
        if self.is_closed() {
            return Ok(());
        }
        let master = self
            .master
            .lock()
            .map_err(|_| TransportError::ChannelClosed)?;
        master
            .resize(pty_size(size))
            .map_err(|e| TransportError::ResizeFailed(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(pid = ?self.pid, "Closing local attach");
        self.kill();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for LocalPtyTransport {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) && self.kill() {
            warn!(pid = ?self.pid, "Local attach dropped without close, killed");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn collect_until_closed(mut events: mpsc::Receiver<TransportEvent>) -> (Vec<u8>, CloseReason) {
        let mut data = Vec::new();
        loop {
            match timeout(Duration::from_secs(5), events.recv()).await {
                Ok(Some(TransportEvent::Data(chunk))) => data.extend(chunk),
                Ok(Some(TransportEvent::Closed(reason))) => return (data, reason),
                Ok(None) => panic!("event channel dropped before close"),
                Err(_) => panic!("timed out waiting for transport events"),
            }
        }
    }

    #[tokio::test]
    async fn output_and_exit_status_are_reported() {
        let opened = LocalPtyTransport::spawn(
            "sh",
            &["-c".to_string(), "printf hello; exit 3".to_string()],
            TermSize::default(),
        )
        .unwrap();

        let (data, reason) = collect_until_closed(opened.events).await;
        assert!(String::from_utf8_lossy(&data).contains("hello"));
        assert_eq!(reason, CloseReason::Exited(Some(3)));
    }

    #[tokio::test]
    async fn input_reaches_the_process() {
        let opened = LocalPtyTransport::spawn(
            "sh",
            &["-c".to_string(), "read line; echo got:$line".to_string()],
            TermSize::default(),
        )
        .unwrap();

        opened.transport.write(b"ping\n").await.unwrap();
        let (data, _) = collect_until_closed(opened.events).await;
        assert!(String::from_utf8_lossy(&data).contains("got:ping"));
    }

    #[tokio::test]
    async fn close_kills_and_later_writes_are_noops() {
        let opened = LocalPtyTransport::spawn("cat", &[], TermSize::new(100, 30)).unwrap();
        opened.transport.resize(TermSize::new(120, 40)).await.unwrap();

        opened.transport.close().await;
        opened.transport.close().await;
        assert!(opened.transport.is_closed());
        assert!(opened.transport.write(b"ignored").await.is_ok());

        let (_, reason) = collect_until_closed(opened.events).await;
        assert!(matches!(reason, CloseReason::Exited(_)));
    }

    #[tokio::test]
    async fn exited_child_is_not_signalled() {
        let (transport, events) = LocalPtyTransport::start(
            "sh",
            &["-c".to_string(), "exit 0".to_string()],
            TermSize::default(),
        )
        .unwrap();

        let (_, reason) = collect_until_closed(events).await;
        assert_eq!(reason, CloseReason::Exited(Some(0)));

        assert!(!transport.kill());
        transport.close().await;
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn running_child_is_signalled_once() {
        let (transport, events) = LocalPtyTransport::start("cat", &[], TermSize::default()).unwrap();

        assert!(transport.kill());
        let (_, reason) = collect_until_closed(events).await;
        assert!(matches!(reason, CloseReason::Exited(_)));
        assert!(!transport.kill());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stalled_reader_does_not_block_other_writes() {
        let stalled = LocalPtyTransport::spawn(
            "sh",
            &["-c".to_string(), "sleep 30".to_string()],
            TermSize::default(),
        )
        .unwrap();
        let mut echo = LocalPtyTransport::spawn("cat", &[], TermSize::default()).unwrap();

        let paste = vec![b'x'; 1 << 20];
        timeout(Duration::from_secs(2), stalled.transport.write(&paste))
            .await
            .expect("write to a stalled PTY blocked the runtime")
            .unwrap();
        timeout(Duration::from_secs(2), echo.transport.write(b"still here\n"))
            .await
            .expect("second transport write blocked")
            .unwrap();

        let mut seen = Vec::new();
        while !String::from_utf8_lossy(&seen).contains("still here") {
            match timeout(Duration::from_secs(5), echo.events.recv()).await {
                Ok(Some(TransportEvent::Data(chunk))) => seen.extend(chunk),
                other => panic!("no echo from second transport: {:?}", other),
            }
        }

        stalled.transport.close().await;
        echo.transport.close().await;
    }

    #[test]
    fn missing_binary_fails_to_spawn() {
        let result = LocalPtyTransport::spawn("/nonexistent/tmux", &[], TermSize::default());
        assert!(matches!(result, Err(TransportError::SpawnFailed(_))));
    }
}
