//! A spawned engine process with its output merged into one line stream.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use crimson_core::{EngineError, EngineExit, EngineRun};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::shutdown::interrupt_child;

/// Output lines buffered between the pipe readers and the consumer.
const LINE_BUFFER: usize = 256;

/// Exit code Python uses after an unhandled `KeyboardInterrupt`.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// One engine process.
///
/// stdout and stderr are each read line by line (lossy UTF-8) on their own
/// task and forwarded into one channel, so lines from each pipe keep their
/// order.
#[derive(Debug)]
pub struct ProcessRun {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl ProcessRun {
    /// Spawn `program` with `args`.
    pub fn spawn<I, S>(program: &OsStr, args: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("PYTHONUNBUFFERED", "1");

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|e| {
            EngineError::Launch(format!("{}: {e}", program.to_string_lossy()))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Launch("Missing stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Launch("Missing stderr".to_string()))?;

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        debug!(pid = ?child.id(), "Engine process spawned");
        Ok(Self { child, lines: rx })
    }
}

#[async_trait]
impl EngineRun for ProcessRun {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    async fn wait(&mut self) -> Result<EngineExit, EngineError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| EngineError::Io(e.to_string()))?;
        Ok(classify_exit(status))
    }

    async fn terminate(&mut self, grace: Duration) -> Result<(), EngineError> {
        let status = interrupt_child(&mut self.child, grace)
            .await
            .map_err(|e| EngineError::Signal(e.to_string()))?;
        debug!(%status, "Engine terminated");
        Ok(())
    }
}

/// Map a process exit status onto the engine's exit classes.
pub(crate) fn classify_exit(status: ExitStatus) -> EngineExit {
    if status.success() {
        return EngineExit::Success;
    }
    match status.code() {
        None | Some(INTERRUPTED_EXIT_CODE) => EngineExit::Aborted,
        code => EngineExit::Failed { code },
    }
}

async fn forward_lines<R>(pipe: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if line.is_empty() {
                    continue;
                }
                trace!(line = %line, "engine");
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "Engine pipe read failed");
                break;
            }
        }
    }
}
