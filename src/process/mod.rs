//! Process invocation for the Claude CLI.
//!
//! This module launches the CLI subprocess, feeds it input, enforces
//! timeouts, and captures its output in one of three modes. Each call spawns
//! a fresh process and owns its handle exclusively until the call completes.
//!
//! # Architecture
//!
//! ```text
//! caller                              claude CLI
//! ┌──────────────┐                   ┌─────────────┐
//! │ Invocation   │───stdin (prompt)─▶│             │
//! │  .run()      │◀──stdout──────────│             │
//! │  .stream()   │◀──stderr──────────│             │
//! │  .stream_json│                   └─────────────┘
//! └──────────────┘
//! ```
//!
//! # Modes
//!
//! - [`Invocation::run`]: wait for exit, return exit code plus everything
//!   written to stdout and stderr. A non-zero exit is returned as data, not
//!   an error; callers decide what counts as failure.
//! - [`Invocation::stream`]: yield stdout lines as they arrive. The stream
//!   itself raises when the process exits non-zero.
//! - [`Invocation::stream_json`]: like `stream`, but each non-blank line is
//!   decoded as one JSON value.

mod json;
mod run;
mod stream;

pub use json::JsonStream;
pub use stream::LineStream;

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::Error;

/// One pending execution of the CLI: the command line, the environment
/// overlay, an optional deadline, and optional stdin text.
///
/// The overlay is merged on top of the inherited environment when the
/// process is spawned; the parent environment is never mutated. Each call to
/// [`run`](Invocation::run), [`stream`](Invocation::stream), or
/// [`stream_json`](Invocation::stream_json) spawns its own subprocess, so an
/// `Invocation` can be executed more than once.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Option<Duration>,
    input: Option<String>,
}

impl Invocation {
    /// Create an invocation of the given program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout: None,
            input: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a single overlay environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Merge a map of overlay environment variables.
    pub fn envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Set the wall-clock deadline for the subprocess.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the text fed to the subprocess on stdin.
    ///
    /// Without input the subprocess sees an immediately-closed stdin; it
    /// never blocks waiting for data that will not come.
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// The program name this invocation will execute.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list, in order.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Build the tokio command shared by all three modes.
    fn build_command(&self, stdin: Stdio) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        // Overlay wins over inherited variables on key collision; the
        // parent environment itself is never touched.
        cmd.envs(&self.env);
        cmd.stdin(stdin);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Result of a blocking invocation.
///
/// A non-zero `exit_code` is not an error at this layer. The conversation
/// layer raises [`Error::Execution`] for non-zero exits; other callers may
/// have different success criteria.
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    /// The process exit code, or -1 when the OS reported none (signal death).
    pub exit_code: i32,
    /// Everything written to stdout, lossily decoded as UTF-8.
    pub stdout: String,
    /// Everything written to stderr, lossily decoded as UTF-8.
    pub stderr: String,
}

impl InvocationOutput {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Map a spawn failure to a descriptive execution error.
fn spawn_error(err: std::io::Error, program: &str) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::execution(format!("command not found: {program}"))
    } else {
        Error::execution(format!("failed to spawn {program}: {err}"))
    }
}
