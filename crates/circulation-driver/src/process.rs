//! Simulator subprocess.
//!
//! The simulator is a child process speaking the line protocol over its
//! stdio. Two background tasks drain stdout and stderr into channels as soon
//! as lines appear, so the child never blocks on a full pipe; the driver
//! pulls stdout lines from its channel with a per-line deadline and checks
//! that the child is still alive while it waits.

use std::{collections::VecDeque, process::Stdio};

use circulation_proto::Command;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter},
    process::{Child, ChildStdin},
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, timeout},
};
use tracing::{debug, trace, warn};

use crate::{
    config::{ProcessConfig, SutCommand},
    error::DriverError,
    transcript::Transcript,
};

/// Running simulator.
pub struct SutProcess {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: mpsc::UnboundedReceiver<String>,
    stderr: mpsc::UnboundedReceiver<String>,
    stderr_tail: VecDeque<String>,
    readers: Vec<JoinHandle<()>>,
    config: ProcessConfig,
    transcript: Transcript,
}

impl SutProcess {
    /// Launch the simulator with piped stdio.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(
        sut: &SutCommand,
        config: ProcessConfig,
        transcript: Transcript,
    ) -> Result<Self, DriverError> {
        let mut child = tokio::process::Command::new(&sut.program)
            .args(&sut.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DriverError::Spawn { program: sut.program.clone(), source })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(DriverError::Config("simulator stdio was not captured".into()));
        };

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let readers = vec![spawn_reader(stdout, stdout_tx, false), spawn_reader(stderr, stderr_tx, true)];
        debug!(program = %sut.program.display(), pid = ?child.id(), "simulator started");

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout: stdout_rx,
            stderr: stderr_rx,
            stderr_tail: VecDeque::new(),
            readers,
            config,
            transcript,
        })
    }

    /// Write one line and flush it.
    pub async fn send_line(&mut self, line: &str) -> Result<(), DriverError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DriverError::Write(std::io::ErrorKind::BrokenPipe.into()))?;
        trace!(line, "send");
        stdin.write_all(line.as_bytes()).await.map_err(DriverError::Write)?;
        stdin.write_all(b"\n").await.map_err(DriverError::Write)?;
        stdin.flush().await.map_err(DriverError::Write)?;
        self.transcript.record_input(line).await
    }

    /// Write several lines in order.
    pub async fn send_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<(), DriverError> {
        for line in lines {
            self.send_line(line.as_ref()).await?;
        }
        Ok(())
    }

    /// Next stdout line, waiting at most the configured line timeout.
    pub async fn recv_line(&mut self) -> Result<String, DriverError> {
        let started = Instant::now();
        let mut exited = None;
        loop {
            match timeout(self.config.poll_interval, self.stdout.recv()).await {
                Ok(Some(line)) => {
                    trace!(line = %line, "recv");
                    self.transcript.record_output(&line).await?;
                    return Ok(line);
                },
                Ok(None) => return Err(self.exited().await),
                Err(_elapsed) => {},
            }

            // Lines already written may still be in flight after the child
            // exits, so an exit only fails the wait once a poll comes back
            // empty.
            if exited.is_some() {
                return Err(self.exited().await);
            }
            exited = self.child.try_wait().ok().flatten();

            let waited = started.elapsed();
            if waited >= self.config.line_timeout {
                return Err(DriverError::Timeout { waited });
            }
        }
    }

    /// Send a command and read its complete framed response.
    pub async fn exchange(&mut self, command: &Command) -> Result<Vec<String>, DriverError> {
        self.send_line(&command.to_string()).await?;
        let first = self.recv_line().await?;
        let len = command.shape().frame_len(&first).map_err(|_| DriverError::MalformedHeader {
            command: command.to_string(),
            line: first.clone(),
        })?;

        // the count is untrusted, so no preallocation
        let mut frame = vec![first];
        while frame.len() < len {
            frame.push(self.recv_line().await?);
        }
        Ok(frame)
    }

    /// Most recent stderr lines, oldest first.
    pub fn stderr_tail(&mut self) -> Vec<String> {
        while let Ok(line) = self.stderr.try_recv() {
            if self.stderr_tail.len() == self.config.stderr_tail {
                self.stderr_tail.pop_front();
            }
            if self.config.stderr_tail > 0 {
                self.stderr_tail.push_back(line);
            }
        }
        self.stderr_tail.iter().cloned().collect()
    }

    /// Close stdin, give the child the grace period to exit, then kill it.
    ///
    /// Returns the exit code when the child exited on its own.
    pub async fn shutdown(mut self) -> Option<i32> {
        drop(self.stdin.take());
        let code = match timeout(self.config.shutdown_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "simulator exited");
                status.code()
            },
            Ok(Err(e)) => {
                warn!(error = %e, "cannot collect simulator status");
                None
            },
            Err(_elapsed) => {
                warn!(grace = ?self.config.shutdown_grace, "simulator ignored end of input, killing");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "cannot kill simulator");
                }
                None
            },
        };
        for reader in &self.readers {
            reader.abort();
        }
        code
    }

    async fn exited(&mut self) -> DriverError {
        let status = match timeout(self.config.poll_interval, self.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_elapsed) => "stdout closed".to_owned(),
        };
        DriverError::Exited { status }
    }
}

impl Drop for SutProcess {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

fn spawn_reader<R>(stream: R, tx: mpsc::UnboundedSender<String>, is_stderr: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if is_stderr {
                        debug!(target: "sut", "{line}");
                    }
                    if tx.send(line).is_err() {
                        break;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(stderr = is_stderr, error = %e, "cannot read simulator output");
                    break;
                },
            }
        }
    })
}
