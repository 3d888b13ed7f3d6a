//! Type-safe configuration options for the Claude CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output format for CLI responses.
///
/// Controls the `--output-format` flag and which read paths a conversation
/// supports: `StreamJson` is required for JSON streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Plain text output (the CLI default, no flag emitted).
    #[default]
    Text,
    /// A single JSON document.
    Json,
    /// Newline-delimited JSON records.
    StreamJson,
}

impl OutputFormat {
    /// The value passed to `--output-format`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier tying the turns of one conversation together.
///
/// Exported to the subprocess as `CLAUDE_CONVERSATION_ID`. Generated as a
/// v4 UUID unless the caller supplies one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// Create a conversation ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Join tool names into the comma-separated form the CLI flags expect.
///
/// Empty entries are skipped so a stray blank never produces `"Read,,Bash"`.
pub fn join_tools<S: AsRef<str>>(tools: &[S]) -> String {
    tools
        .iter()
        .map(AsRef::as_ref)
        .filter(|tool| !tool.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a comma-separated tool list back into trimmed, non-empty names.
pub fn parse_tools(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tool| !tool.is_empty())
        .map(String::from)
        .collect()
}

/// Standard tool names accepted by `--allowedTools` and `--disallowedTools`.
pub mod tools {
    /// Execute shell commands.
    pub const BASH: &str = "Bash";
    /// Read file contents.
    pub const READ: &str = "Read";
    /// Write files.
    pub const WRITE: &str = "Write";
    /// Edit files in place.
    pub const EDIT: &str = "Edit";
    /// Find files by glob pattern.
    pub const GLOB: &str = "Glob";
    /// Search file contents.
    pub const GREP: &str = "Grep";
    /// Fetch web content.
    pub const WEB_FETCH: &str = "WebFetch";
    /// Search the web.
    pub const WEB_SEARCH: &str = "WebSearch";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn output_format_cli_values() {
        assert_eq!(OutputFormat::Text.as_str(), "text");
        assert_eq!(OutputFormat::Json.as_str(), "json");
        assert_eq!(OutputFormat::StreamJson.as_str(), "stream-json");
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::StreamJson.to_string(), "stream-json");
    }

    #[test]
    fn output_format_serde() {
        let json = serde_json::to_string(&OutputFormat::StreamJson).unwrap();
        assert_eq!(json, "\"stream-json\"");

        let parsed: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(parsed, OutputFormat::Json);
    }

    #[test]
    fn conversation_id_accessors() {
        let id = ConversationId::new("conv-123");
        assert_eq!(id.as_str(), "conv-123");
        assert_eq!(id.to_string(), "conv-123");
        assert_eq!(ConversationId::from("conv-123"), id);
    }

    #[test]
    fn conversation_id_generate_is_unique() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn join_tools_basic() {
        assert_eq!(join_tools(&["Read", "Glob", "Bash"]), "Read,Glob,Bash");
    }

    #[test]
    fn join_tools_skips_empties() {
        assert_eq!(join_tools(&["Read", "", "Bash"]), "Read,Bash");
        assert_eq!(join_tools::<&str>(&[]), "");
    }

    #[test]
    fn parse_tools_trims_and_filters() {
        assert_eq!(
            parse_tools(" Read , Glob ,, Bash "),
            vec!["Read", "Glob", "Bash"]
        );
        assert!(parse_tools("").is_empty());
        assert!(parse_tools(" , ,").is_empty());
    }

    #[test]
    fn join_parse_agrees() {
        let joined = join_tools(&[tools::READ, tools::WEB_FETCH]);
        assert_eq!(parse_tools(&joined), vec!["Read", "WebFetch"]);
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OutputFormat>();
        assert_send_sync::<ConversationId>();
    }
}
