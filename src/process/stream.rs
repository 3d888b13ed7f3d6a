//! Line streaming with deadline enforcement and guaranteed cleanup.
//!
//! The consumer pulls one line at a time; no worker thread drains output.
//! A deadline, when configured, is enforced by a separate timer task that
//! kills the subprocess out-of-band, so a stalled read cannot outlive it.
//! Dropping the stream at any point kills the subprocess.

use std::future::Future;
use std::io::{Seek, SeekFrom, Write};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{spawn_error, Invocation};
use crate::{Error, Result};

/// Interval between exit checks after stdout closes.
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(20);

impl Invocation {
    /// Spawn the subprocess and return a lazy stream of its stdout lines.
    ///
    /// Input, when present, is spooled to an anonymous temporary file before
    /// the process is spawned, and stdin is attached to that file rather
    /// than a live pipe, so feeding a large input cannot deadlock against a
    /// slow consumer. Without input, stdin is closed from the start.
    ///
    /// The stream ends silently on a zero exit. On a non-zero exit it yields
    /// [`Error::Execution`] with the exit code and the full stderr text,
    /// read only after stdout is exhausted. If the deadline killed the
    /// process, [`Error::Timeout`] is yielded instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] when the input cannot be spooled or the
    /// process cannot be spawned.
    pub async fn stream(&self) -> Result<LineStream> {
        let stdin = match self.input.as_deref() {
            Some(text) => Stdio::from(spool_input(text)?),
            None => Stdio::null(),
        };
        let mut cmd = self.build_command(stdin);

        let mut child = cmd.spawn().map_err(|e| spawn_error(e, &self.program))?;
        tracing::debug!("spawned {} {:?} for streaming", self.program, self.args);

        let stdout = child.stdout.take().expect("stdout was configured");
        let stderr = child.stderr.take().expect("stderr was configured");

        let shared = Arc::new(Mutex::new(SharedChild {
            child,
            timed_out: false,
        }));
        let deadline = self
            .timeout
            .map(|limit| spawn_deadline(Arc::clone(&shared), limit));

        Ok(LineStream {
            state: Some(StreamState {
                stdout: BufReader::new(stdout),
                stderr: Some(stderr),
                shared,
                deadline,
                timeout: self.timeout,
            }),
            pending: None,
            done: false,
        })
    }
}

/// Write the input to an anonymous temporary file and rewind it so the
/// child reads from the start. The file is already unlinked; the child's
/// stdin handle is the last reference and releases it when the process dies.
fn spool_input(text: &str) -> Result<std::fs::File> {
    let mut file = tempfile::tempfile()
        .map_err(|e| Error::execution(format!("failed to create input spool: {e}")))?;
    file.write_all(text.as_bytes())
        .map_err(|e| Error::execution(format!("failed to spool input: {e}")))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| Error::execution(format!("failed to rewind input spool: {e}")))?;
    Ok(file)
}

/// Child handle shared between the stream and the deadline task.
struct SharedChild {
    child: Child,
    /// Set by the deadline task, under the lock, before it kills.
    timed_out: bool,
}

type SharedHandle = Arc<Mutex<SharedChild>>;

/// Kill the subprocess if it has not already exited.
///
/// The guard against an exited child keeps a deadline that fires during
/// normal teardown from flagging a completed run as timed out.
fn spawn_deadline(shared: SharedHandle, limit: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        let mut guard = shared.lock().await;
        if matches!(guard.child.try_wait(), Ok(None)) {
            tracing::warn!("deadline of {:?} elapsed, killing process", limit);
            guard.timed_out = true;
            let _ = guard.child.start_kill();
        }
    })
}

/// State owned by the in-flight read future between polls.
struct StreamState {
    stdout: BufReader<ChildStdout>,
    stderr: Option<ChildStderr>,
    shared: SharedHandle,
    deadline: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

impl Drop for StreamState {
    fn drop(&mut self) {
        if let Some(task) = self.deadline.take() {
            task.abort();
        }
        // On abandonment the child is still alive; kill it. The lock is
        // only ever contended by the deadline task, which kills too.
        if let Ok(mut guard) = self.shared.try_lock() {
            let _ = guard.child.start_kill();
        }
    }
}

type NextFuture = Pin<Box<dyn Future<Output = (Option<StreamState>, Option<Result<String>>)> + Send>>;

/// A lazy, forward-only stream of subprocess output lines.
///
/// Created by [`Invocation::stream`]. Lines are yielded in write order with
/// the trailing newline stripped; stderr is never interleaved. The sequence
/// is not restartable; a new call spawns a new subprocess.
///
/// # Cancellation
///
/// Dropping the stream at any point, including mid-consumption, kills the
/// subprocess and cancels the deadline task.
pub struct LineStream {
    state: Option<StreamState>,
    pending: Option<NextFuture>,
    done: bool,
}

// Manual impl: `NextFuture` is a boxed `dyn Future`, so Debug cannot be derived.
impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl futures::Stream for LineStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        // If we have a pending future, poll it
        if let Some(ref mut pending) = self.pending {
            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready((state, item)) => {
                    self.pending = None;
                    self.state = state;
                    return match item {
                        Some(Ok(line)) => Poll::Ready(Some(Ok(line))),
                        Some(Err(e)) => {
                            self.done = true;
                            Poll::Ready(Some(Err(e)))
                        }
                        None => {
                            self.done = true;
                            Poll::Ready(None)
                        }
                    };
                }
            }
        }

        // Take the state and create a new read future
        if let Some(state) = self.state.take() {
            self.pending = Some(Box::pin(advance(state)));
            // Poll the new future on the next pass
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        // No state left, stream is exhausted
        Poll::Ready(None)
    }
}

/// Read one line, or finish the stream when stdout closes.
async fn advance(mut state: StreamState) -> (Option<StreamState>, Option<Result<String>>) {
    let mut line = String::new();
    match state.stdout.read_line(&mut line).await {
        Ok(0) => (None, finish(state).await),
        Ok(_) => {
            normalize_line(&mut line);
            (Some(state), Some(Ok(line)))
        }
        Err(err) => {
            kill_and_reap(&state.shared).await;
            if let Some(task) = state.deadline.take() {
                task.abort();
            }
            let wrapped = Error::execution(format!("error reading command output: {err}"));
            (None, Some(Err(wrapped)))
        }
    }
}

/// Stdout closed: reap the child, cancel the deadline, and decide how the
/// sequence ends.
async fn finish(mut state: StreamState) -> Option<Result<String>> {
    // Poll try_wait in short lock scopes rather than holding the lock
    // across wait(): the deadline task needs the same lock to kill a child
    // that lingers after closing stdout. The timed_out flag is read in the
    // lock scope that observes the exit, so it stays coherent with it.
    let (status, timed_out) = loop {
        {
            let mut guard = state.shared.lock().await;
            match guard.child.try_wait() {
                Ok(Some(status)) => break (Ok(status), guard.timed_out),
                Ok(None) => {}
                Err(err) => break (Err(err), guard.timed_out),
            }
        }
        tokio::time::sleep(REAP_POLL_INTERVAL).await;
    };
    if let Some(task) = state.deadline.take() {
        task.abort();
    }

    match status {
        Err(err) => Some(Err(Error::execution(format!(
            "error waiting for command: {err}"
        )))),
        Ok(_) if timed_out => {
            let stderr = read_stderr(&mut state.stderr).await;
            Some(Err(Error::Timeout {
                timeout: state.timeout.unwrap_or_default(),
                stdout: String::new(),
                stderr,
            }))
        }
        Ok(status) if !status.success() => {
            let exit_code = status.code().unwrap_or(-1);
            tracing::debug!("streamed process exited with code {}", exit_code);
            let stderr = read_stderr(&mut state.stderr).await;
            Some(Err(Error::exit_failure(exit_code, String::new(), stderr)))
        }
        Ok(_) => None,
    }
}

/// Drain whatever the exited process left on stderr. Failures here are
/// expected races, not user-facing errors.
async fn read_stderr(stderr: &mut Option<ChildStderr>) -> String {
    let Some(mut pipe) = stderr.take() else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kill the subprocess and wait for it, if it is still running.
async fn kill_and_reap(shared: &SharedHandle) {
    let mut guard = shared.lock().await;
    if matches!(guard.child.try_wait(), Ok(None)) {
        let _ = guard.child.kill().await;
    }
}

/// Strip one trailing newline, and a carriage return before it.
fn normalize_line(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}
