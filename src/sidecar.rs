//! The transcription backend, run as a child process.
//!
//! Audio capture and the speech models live in the backend. We talk to it
//! over a line protocol: lifecycle commands (`start`, `stop`, `cancel`) go to
//! its stdin, and it answers on stdout with `status <text>` and
//! `transcript <text>` lines.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;

use openwhisper_engine::{Deliver, LifecycleEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no backend command configured")]
    MissingCommand,
    #[error("failed to start backend `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("backend stdio is not piped")]
    Stdio,
    #[error("failed to write to backend: {0}")]
    Write(#[source] io::Error),
}

/// A line read from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    Status(String),
    Transcript(String),
    /// The backend closed stdout, usually because it exited
    Exited,
}

/// Parses one output line. Lines of any other kind are not ours.
pub fn parse_line(line: &str) -> Option<BackendMessage> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (kind, rest) = line.split_once(' ').unwrap_or((line, ""));
    match kind {
        "status" => Some(BackendMessage::Status(rest.to_owned())),
        "transcript" => Some(BackendMessage::Transcript(rest.to_owned())),
        _ => None,
    }
}

/// A running backend. The process is killed on drop.
pub struct Backend {
    child: Child,
    stdin: ChildStdin,
}

impl Backend {
    /// Starts `argv` and delivers everything it prints from a reader thread.
    pub fn spawn(argv: &[String], deliver: Deliver<BackendMessage>) -> Result<Self, BackendError> {
        let (program, args) = argv.split_first().ok_or(BackendError::MissingCommand)?;
        let spawn_error = |source| BackendError::Spawn {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(BackendError::Stdio);
        };

        if let Err(e) = thread::Builder::new()
            .name("backend-reader".into())
            .spawn(move || read_messages(stdout, deliver))
        {
            let _ = child.kill();
            return Err(spawn_error(e));
        }

        info!(pid = child.id(), program = %program, "Backend started");
        Ok(Self { child, stdin })
    }

    /// Tells the backend about a lifecycle transition.
    pub fn send(&mut self, event: LifecycleEvent) -> Result<(), BackendError> {
        debug!(command = event.command(), "Sending command to backend");
        writeln!(self.stdin, "{}", event.command())
            .and_then(|_| self.stdin.flush())
            .map_err(BackendError::Write)
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        info!(pid = self.child.id(), "Stopping backend");
        match self.child.kill() {
            Ok(()) => match self.child.wait() {
                Ok(status) => debug!(%status, "Backend exited"),
                Err(e) => warn!("Failed to wait for backend exit: {}", e),
            },
            // Already exited
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => warn!("Failed to kill backend: {}", e),
        }
    }
}

fn read_messages(stdout: ChildStdout, deliver: Deliver<BackendMessage>) {
    for line in BufReader::new(stdout).lines() {
        match line {
            Ok(line) => match parse_line(&line) {
                Some(message) => deliver(message),
                None => debug!(line = %line, "Ignoring backend output"),
            },
            Err(e) => {
                warn!("Failed to read backend output: {}", e);
                break;
            }
        }
    }
    info!("Backend output closed");
    deliver(BackendMessage::Exited);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("status Recording in progress..."),
            Some(BackendMessage::Status("Recording in progress...".into()))
        );
        assert_eq!(
            parse_line("transcript hello  world\r\n"),
            Some(BackendMessage::Transcript("hello  world".into()))
        );
        assert_eq!(parse_line("transcript"), Some(BackendMessage::Transcript(String::new())));
        assert_eq!(parse_line("loading model weights"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("Status Ready"), None);
    }

    #[test]
    fn test_missing_command() {
        let deliver: Deliver<BackendMessage> = std::sync::Arc::new(|_| {});
        assert!(matches!(
            Backend::spawn(&[], deliver),
            Err(BackendError::MissingCommand)
        ));
    }

    #[test]
    fn test_spawn_failure() {
        let deliver: Deliver<BackendMessage> = std::sync::Arc::new(|_| {});
        let argv = vec!["/nonexistent/openwhisper-backend".to_string()];
        assert!(matches!(
            Backend::spawn(&argv, deliver),
            Err(BackendError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_round_trip_with_shell_backend() {
        use std::sync::Arc;
        use std::sync::mpsc;
        use std::time::Duration;

        let (tx, rx) = mpsc::channel();
        let deliver: Deliver<BackendMessage> = Arc::new(move |message| {
            let _ = tx.send(message);
        });
        let script = r#"echo "status Ready"; read cmd; echo "status got $cmd"; echo "transcript hi there""#;
        let argv = ["sh", "-c", script].map(String::from);

        let mut backend = Backend::spawn(&argv, deliver).unwrap();
        let wait = Duration::from_secs(5);
        assert_eq!(rx.recv_timeout(wait), Ok(BackendMessage::Status("Ready".into())));

        backend.send(LifecycleEvent::Started).unwrap();
        assert_eq!(rx.recv_timeout(wait), Ok(BackendMessage::Status("got start".into())));
        assert_eq!(rx.recv_timeout(wait), Ok(BackendMessage::Transcript("hi there".into())));
        assert_eq!(rx.recv_timeout(wait), Ok(BackendMessage::Exited));
    }
}
