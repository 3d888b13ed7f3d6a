//! Blocking invocation: run the CLI to completion and collect all output.

use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{spawn_error, Invocation, InvocationOutput};
use crate::{Error, Result};

impl Invocation {
    /// Run the subprocess to completion and return its exit code and
    /// captured output.
    ///
    /// Input, when present, is written to stdin in full before output is
    /// drained. Output bytes are decoded as UTF-8 with invalid sequences
    /// replaced, so output is never lost to a decode failure.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] when the deadline elapses first. The process is
    ///   killed and reaped, and whatever partial output both pipes held is
    ///   carried in the error.
    /// - [`Error::Execution`] when the process cannot be spawned or an I/O
    ///   failure interrupts communication with it.
    ///
    /// A non-zero exit code is **not** an error here: it is returned in the
    /// [`InvocationOutput`] for the caller to interpret.
    pub async fn run(&self) -> Result<InvocationOutput> {
        let stdin = if self.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut cmd = self.build_command(stdin);

        let mut child = cmd.spawn().map_err(|e| spawn_error(e, &self.program))?;
        tracing::debug!("spawned {} {:?}", self.program, self.args);

        let stdin_pipe = self
            .input
            .as_deref()
            .map(|_| child.stdin.take().expect("stdin was configured"));
        let mut stdout_pipe = child.stdout.take().expect("stdout was configured");
        let mut stderr_pipe = child.stderr.take().expect("stderr was configured");

        // The buffers live outside the drain future so that dropping it on
        // timeout keeps whatever had been read so far.
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let drain = async {
            if let (Some(mut pipe), Some(text)) = (stdin_pipe, self.input.as_deref()) {
                pipe.write_all(text.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            let (out, err, status) = tokio::join!(
                stdout_pipe.read_to_end(&mut stdout_buf),
                stderr_pipe.read_to_end(&mut stderr_buf),
                child.wait(),
            );
            out?;
            err?;
            status
        };

        // Await in its own statement so the drain future (and its borrows of
        // the child and buffers) is gone before the failure paths run.
        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, drain).await.map_err(|_| limit),
            None => Ok(drain.await),
        };

        let status = match waited {
            Err(limit) => {
                tracing::warn!("command timed out after {:?}, killing process", limit);
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(Error::Timeout {
                    timeout: limit,
                    stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                });
            }
            Ok(Err(err)) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(Error::execution(format!("error running command: {err}")));
            }
            Ok(Ok(status)) => status,
        };

        let exit_code = status.code().unwrap_or(-1);
        tracing::debug!("{} exited with code {}", self.program, exit_code);

        Ok(InvocationOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        })
    }
}
