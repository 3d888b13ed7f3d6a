use std::time::Duration;

/// Errors that can occur when using claude-code.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time or on call entry
/// - Invocation errors: failures launching or waiting on the CLI process
/// - Decode errors: malformed JSON in streamed CLI output
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time or on call entry)
    // -------------------------------------------------------------------------
    /// Authentication configuration is missing a required field.
    ///
    /// Each backend has its own requirements: the Anthropic API needs an API
    /// key, Bedrock needs a region, Vertex needs a region and a project ID.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Caller-supplied input or configuration was rejected.
    ///
    /// Raised for empty prompts, exhausted turn limits, tools listed as both
    /// allowed and disallowed, and malformed MCP configuration files.
    #[error("validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Invocation errors
    // -------------------------------------------------------------------------
    /// The CLI process exceeded the allotted duration and was killed.
    ///
    /// Carries whatever output had been captured when the deadline fired.
    /// There is no exit code: the process did not exit on its own.
    #[error("command timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    /// The CLI process failed: it exited non-zero, or it could not be
    /// spawned or communicated with at all.
    ///
    /// `exit_code` is present only when the process ran to completion.
    #[error("{message}")]
    Execution {
        message: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    // -------------------------------------------------------------------------
    // Decode errors
    // -------------------------------------------------------------------------
    /// A non-blank line of streamed output was not valid JSON.
    ///
    /// Distinct from [`Error::Execution`] so callers can tell "the tool ran
    /// but emitted malformed data" apart from "the tool failed".
    #[error("failed to decode JSON line: {message}")]
    JsonDecode {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A specialized Result type for claude-code operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an execution error with a descriptive message and no captured
    /// output.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Create an execution error for a process that exited non-zero.
    pub(crate) fn exit_failure(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self::Execution {
            message: format!("command failed with exit code {exit_code}"),
            exit_code: Some(exit_code),
            stdout,
            stderr,
        }
    }

    /// Create a JSON decode error with context.
    pub fn json_decode(source: serde_json::Error, raw: &str) -> Self {
        Self::JsonDecode {
            message: format!(
                "at position {}: {}",
                source.column(),
                raw.chars().take(100).collect::<String>()
            ),
            source,
        }
    }

    /// The subprocess exit code, when the failure carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::Execution { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Check if this error was caused by a deadline firing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::execution(format!("I/O error: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonDecode {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn exit_code_accessor() {
        let err = Error::exit_failure(2, String::new(), "boom".into());
        assert_eq!(err.exit_code(), Some(2));

        let err = Error::execution("could not spawn");
        assert_eq!(err.exit_code(), None);

        let err = Error::Timeout {
            timeout: Duration::from_secs(5),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn is_timeout_detection() {
        assert!(Error::Timeout {
            timeout: Duration::from_secs(30),
            stdout: "partial".into(),
            stderr: String::new(),
        }
        .is_timeout());
        assert!(!Error::execution("spawn failed").is_timeout());
        assert!(!Error::Validation("empty prompt".into()).is_timeout());
    }

    #[test]
    fn exit_failure_message() {
        let err = Error::exit_failure(1, String::new(), String::new());
        assert_eq!(err.to_string(), "command failed with exit code 1");
    }

    #[test]
    fn timeout_message_includes_duration() {
        let err = Error::Timeout {
            timeout: Duration::from_secs(3),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("3s"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Execution { exit_code: None, .. }));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::JsonDecode { .. }));
    }

    #[test]
    fn question_mark_operator_io() {
        fn fallible_io() -> Result<()> {
            let _file = std::fs::File::open("/nonexistent/path/that/does/not/exist")?;
            Ok(())
        }
        let result = fallible_io();
        assert!(matches!(result, Err(Error::Execution { .. })));
    }

    #[test]
    fn question_mark_operator_json() {
        fn fallible_json() -> Result<()> {
            let _: serde_json::Value = serde_json::from_str("not valid json")?;
            Ok(())
        }
        let result = fallible_json();
        assert!(matches!(result, Err(Error::JsonDecode { .. })));
    }

    #[test]
    fn json_decode_truncates_long_lines() {
        let long = format!("{}{}", "x".repeat(300), "{");
        let source = serde_json::from_str::<serde_json::Value>(&long).unwrap_err();
        let err = Error::json_decode(source, &long);
        match err {
            Error::JsonDecode { message, .. } => assert!(message.len() < 150),
            _ => panic!("expected JsonDecode"),
        }
    }
}
