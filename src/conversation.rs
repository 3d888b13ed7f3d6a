//! Multi-turn conversations.
//!
//! This module provides [`Conversation`] for exchanging several prompts with
//! the CLI in one context. Each turn runs a fresh subprocess; continuity
//! comes from the `-c` flag on every turn after the first and from the
//! conversation ID exported in the subprocess environment.
//!
//! # Example
//!
//! ```ignore
//! use claude_code::{ClaudeCode, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClaudeCode::builder().api_key("sk-ant-...").build()?;
//!
//!     let mut conversation = client.start_conversation()?;
//!     let first = conversation.send("My name is Alice").await?;
//!     let second = conversation.send("What's my name?").await?;
//!     println!("{second}");
//!
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::auth::ENV_MODEL;
use crate::config::builder::check_tool_overlap;
use crate::config::{join_tools, ClientConfig, ConversationId, OutputFormat};
use crate::process::{Invocation, JsonStream, LineStream};
use crate::{Error, Result};

/// Environment variable carrying the conversation ID to the subprocess.
pub const ENV_CONVERSATION_ID: &str = "CLAUDE_CONVERSATION_ID";

/// A multi-turn conversation with the CLI.
///
/// Conversations track a turn count. The first turn starts fresh; later
/// turns pass `-c` so the CLI continues from its stored context. Sending
/// consumes a `&mut` borrow, so turns are naturally ordered.
///
/// Create one through [`ClaudeCode::start_conversation`](crate::ClaudeCode::start_conversation)
/// or, with per-conversation overrides, through
/// [`ClaudeCode::conversation`](crate::ClaudeCode::conversation).
#[derive(Debug)]
pub struct Conversation {
    /// Client configuration for the CLI command and credentials.
    config: Arc<ClientConfig>,
    /// Identifier exported to every turn's subprocess.
    id: ConversationId,
    /// Response format requested from the CLI.
    output_format: OutputFormat,
    /// Effective tool whitelist (empty means no restriction).
    allowed_tools: Vec<String>,
    /// Effective tool blacklist (empty means no restriction).
    disallowed_tools: Vec<String>,
    /// Turn limit, checked before each send.
    max_turns: Option<u32>,
    /// MCP configuration passed with `--mcp-config`.
    mcp_config: Option<PathBuf>,
    /// Model override exported as ANTHROPIC_MODEL.
    model: Option<String>,
    /// Per-invocation deadline.
    timeout: Option<Duration>,
    /// Completed turns so far.
    turn_count: u32,
}

impl Conversation {
    /// Get the conversation ID.
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Get the response format this conversation requests.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Number of completed turns.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Send a prompt and wait for the complete response text.
    ///
    /// A non-zero exit from the CLI is reported as [`Error::Execution`]
    /// carrying the exit code and both output channels.
    pub async fn send(&mut self, prompt: &str) -> Result<String> {
        self.check_send(prompt)?;

        let output = self.invocation(prompt).run().await?;
        if output.exit_code != 0 {
            return Err(Error::Execution {
                message: format!("Claude Code failed with exit code {}", output.exit_code),
                exit_code: Some(output.exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        self.turn_count += 1;
        Ok(output.stdout)
    }

    /// Send a prompt and stream the response line by line.
    ///
    /// The turn is counted as soon as the subprocess starts; the CLI's
    /// conversation state advances whether or not the stream is read to the
    /// end.
    pub async fn stream(&mut self, prompt: &str) -> Result<LineStream> {
        self.check_send(prompt)?;

        let stream = self.invocation(prompt).stream().await?;
        self.turn_count += 1;
        Ok(stream)
    }

    /// Send a prompt and stream the response as decoded JSON records.
    ///
    /// Requires the conversation to use [`OutputFormat::StreamJson`].
    pub async fn stream_json(&mut self, prompt: &str) -> Result<JsonStream> {
        if self.output_format != OutputFormat::StreamJson {
            return Err(Error::validation(
                "output format must be stream-json for stream_json",
            ));
        }
        self.check_send(prompt)?;

        let stream = self.invocation(prompt).stream_json().await?;
        self.turn_count += 1;
        Ok(stream)
    }

    /// Validate a prompt against this conversation's state.
    fn check_send(&self, prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt cannot be empty"));
        }
        if let Some(limit) = self.max_turns {
            if self.turn_count >= limit {
                return Err(Error::validation(format!(
                    "conversation has reached the maximum number of turns: {limit}"
                )));
            }
        }
        Ok(())
    }

    /// Assemble the subprocess invocation for one turn.
    ///
    /// The prompt travels on stdin, never on the command line.
    fn invocation(&self, prompt: &str) -> Invocation {
        let mut invocation = Invocation::new(self.config.cli_command())
            .args(self.build_args())
            .envs(self.environment())
            .input(prompt);
        if let Some(timeout) = self.timeout {
            invocation = invocation.timeout(timeout);
        }
        invocation
    }

    /// CLI arguments for the next turn.
    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-p".to_string()];

        if self.output_format != OutputFormat::Text {
            args.push("--output-format".to_string());
            args.push(self.output_format.as_str().to_string());
        }

        // Continue from stored context on every turn after the first
        if self.turn_count > 0 {
            args.push("-c".to_string());
        }

        if !self.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(join_tools(&self.allowed_tools));
        }
        if !self.disallowed_tools.is_empty() {
            args.push("--disallowedTools".to_string());
            args.push(join_tools(&self.disallowed_tools));
        }

        if let Some(max_turns) = self.max_turns {
            args.push("--max-turns".to_string());
            args.push(max_turns.to_string());
        }

        if let Some(path) = &self.mcp_config {
            args.push("--mcp-config".to_string());
            args.push(path.display().to_string());
        }

        args
    }

    /// Environment overlay for the next turn.
    fn environment(&self) -> HashMap<String, String> {
        let mut env = self.config.auth.environment();

        if let Some(model) = &self.model {
            env.insert(ENV_MODEL.to_string(), model.clone());
        }
        env.insert(
            ENV_CONVERSATION_ID.to_string(),
            self.id.as_str().to_string(),
        );

        env
    }
}

/// Builder for [`Conversation`] with per-conversation overrides.
///
/// Every setting left untouched falls back to the client configuration.
#[derive(Debug)]
pub struct ConversationBuilder {
    config: Arc<ClientConfig>,
    id: Option<ConversationId>,
    output_format: OutputFormat,
    allowed_tools: Option<Vec<String>>,
    disallowed_tools: Option<Vec<String>>,
    max_turns: Option<u32>,
    mcp_config: Option<PathBuf>,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl ConversationBuilder {
    pub(crate) fn new(config: Arc<ClientConfig>) -> Self {
        Self {
            config,
            id: None,
            output_format: OutputFormat::default(),
            allowed_tools: None,
            disallowed_tools: None,
            max_turns: None,
            mcp_config: None,
            model: None,
            timeout: None,
        }
    }

    /// Reuse an existing conversation ID instead of generating one.
    pub fn id(mut self, id: impl Into<ConversationId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the response format (default: text).
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Override the allowed tool list for this conversation.
    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Override the disallowed tool list for this conversation.
    pub fn disallowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.disallowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Override the turn limit for this conversation.
    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Override the MCP configuration path for this conversation.
    pub fn mcp_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.mcp_config = Some(path.into());
        self
    }

    /// Override the model for this conversation.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the timeout for this conversation.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Start the conversation.
    ///
    /// Validates the effective tool lists and turn limit the same way the
    /// client configuration does.
    pub fn start(self) -> Result<Conversation> {
        let allowed_tools = effective_tools(self.allowed_tools, &self.config.allowed_tools);
        let disallowed_tools =
            effective_tools(self.disallowed_tools, &self.config.disallowed_tools);
        check_tool_overlap(&allowed_tools, &disallowed_tools)?;

        let max_turns = self.max_turns.or(self.config.max_turns);
        if max_turns == Some(0) {
            return Err(Error::validation("max_turns must be at least 1"));
        }

        Ok(Conversation {
            id: self.id.unwrap_or_else(ConversationId::generate),
            output_format: self.output_format,
            allowed_tools,
            disallowed_tools,
            max_turns,
            mcp_config: self.mcp_config.or_else(|| self.config.mcp_config.clone()),
            model: self.model.or_else(|| self.config.auth.model.clone()),
            timeout: self.timeout.or(self.config.timeout),
            turn_count: 0,
            config: self.config,
        })
    }
}

/// An override replaces the configured list only when it has entries.
fn effective_tools(overridden: Option<Vec<String>>, configured: &[String]) -> Vec<String> {
    match overridden {
        Some(tools) if !tools.is_empty() => tools,
        _ => configured.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::auth::{ENV_API_KEY, ENV_USE_BEDROCK};
    use crate::config::AuthBackend;

    fn test_config() -> Arc<ClientConfig> {
        Arc::new(
            ClientConfig::builder()
                .api_key("sk-test")
                .model("test-model")
                .build()
                .unwrap(),
        )
    }

    fn conversation(config: Arc<ClientConfig>) -> Conversation {
        ConversationBuilder::new(config).start().unwrap()
    }

    #[test]
    fn args_default_to_print_flag_only() {
        let conv = conversation(test_config());
        assert_eq!(conv.build_args(), ["-p"]);
    }

    #[test]
    fn args_include_output_format_when_not_text() {
        let conv = ConversationBuilder::new(test_config())
            .output_format(OutputFormat::StreamJson)
            .start()
            .unwrap();

        let args = conv.build_args();
        assert_eq!(args, ["-p", "--output-format", "stream-json"]);
    }

    #[test]
    fn args_add_continue_flag_after_first_turn() {
        let mut conv = conversation(test_config());
        assert!(!conv.build_args().contains(&"-c".to_string()));

        conv.turn_count = 1;
        assert!(conv.build_args().contains(&"-c".to_string()));
    }

    #[test]
    fn args_join_tool_lists() {
        let conv = ConversationBuilder::new(test_config())
            .allowed_tools(["Read", "Glob"])
            .disallowed_tools(["Bash"])
            .start()
            .unwrap();

        let args = conv.build_args();
        assert_eq!(
            args,
            [
                "-p",
                "--allowedTools",
                "Read,Glob",
                "--disallowedTools",
                "Bash"
            ]
        );
    }

    #[test]
    fn args_include_max_turns_and_mcp_config() {
        let conv = ConversationBuilder::new(test_config())
            .max_turns(5)
            .mcp_config("/tmp/mcp.json")
            .start()
            .unwrap();

        let args = conv.build_args();
        assert_eq!(
            args,
            ["-p", "--max-turns", "5", "--mcp-config", "/tmp/mcp.json"]
        );
    }

    #[test]
    fn environment_carries_auth_model_and_id() {
        let conv = conversation(test_config());
        let env = conv.environment();

        assert_eq!(env.get(ENV_API_KEY), Some(&"sk-test".to_string()));
        assert_eq!(env.get(ENV_MODEL), Some(&"test-model".to_string()));
        assert_eq!(env.get(ENV_CONVERSATION_ID), Some(&conv.id.to_string()));
    }

    #[test]
    fn environment_model_override_wins() {
        let conv = ConversationBuilder::new(test_config())
            .model("override-model")
            .start()
            .unwrap();

        let env = conv.environment();
        assert_eq!(env.get(ENV_MODEL), Some(&"override-model".to_string()));
    }

    #[test]
    fn environment_bedrock_backend() {
        let config = Arc::new(
            ClientConfig::builder()
                .backend(AuthBackend::AwsBedrock)
                .region("us-west-2")
                .build()
                .unwrap(),
        );
        let conv = conversation(config);

        let env = conv.environment();
        assert_eq!(env.get(ENV_USE_BEDROCK), Some(&"1".to_string()));
        assert!(!env.contains_key(ENV_API_KEY));
    }

    #[test]
    fn invocation_feeds_prompt_on_stdin() {
        let conv = conversation(test_config());
        let invocation = conv.invocation("hello");

        assert_eq!(invocation.program(), "claude");
        assert!(!invocation.get_args().iter().any(|arg| arg == "hello"));
    }

    #[test]
    fn ids_are_generated_uniquely() {
        let config = test_config();
        let a = conversation(config.clone());
        let b = conversation(config);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn explicit_id_is_kept() {
        let conv = ConversationBuilder::new(test_config())
            .id("conv-42")
            .start()
            .unwrap();
        assert_eq!(conv.id().as_str(), "conv-42");
    }

    #[tokio::test]
    async fn send_rejects_empty_prompt() {
        let mut conv = conversation(test_config());

        let err = conv.send("   \n").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(conv.turn_count(), 0);
    }

    #[tokio::test]
    async fn send_rejects_exhausted_turn_limit() {
        let mut conv = ConversationBuilder::new(test_config())
            .max_turns(2)
            .start()
            .unwrap();
        conv.turn_count = 2;

        let err = conv.send("hello").await.unwrap_err();
        match err {
            Error::Validation(message) => assert!(message.contains("maximum number of turns")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_json_requires_stream_json_format() {
        let mut conv = conversation(test_config());

        let err = conv.stream_json("hello").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn builder_overrides_fall_back_to_config() {
        let config = Arc::new(
            ClientConfig::builder()
                .api_key("sk-test")
                .allowed_tools(["Read"])
                .max_turns(7)
                .build()
                .unwrap(),
        );
        let conv = ConversationBuilder::new(config).start().unwrap();

        assert_eq!(conv.allowed_tools, ["Read".to_string()]);
        assert_eq!(conv.max_turns, Some(7));
    }

    #[test]
    fn builder_empty_override_falls_back() {
        let config = Arc::new(
            ClientConfig::builder()
                .api_key("sk-test")
                .allowed_tools(["Read"])
                .build()
                .unwrap(),
        );
        let conv = ConversationBuilder::new(config)
            .allowed_tools(Vec::<String>::new())
            .start()
            .unwrap();

        assert_eq!(conv.allowed_tools, ["Read".to_string()]);
    }

    #[test]
    fn builder_rejects_overlapping_override() {
        let config = Arc::new(
            ClientConfig::builder()
                .api_key("sk-test")
                .disallowed_tools(["Bash"])
                .build()
                .unwrap(),
        );
        let result = ConversationBuilder::new(config)
            .allowed_tools(["Bash"])
            .start();

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn conversation_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Conversation>();
        assert_send_sync::<ConversationBuilder>();
    }
}
