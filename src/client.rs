//! High-level client for running prompts and starting conversations.
//!
//! This module provides [`ClaudeCode`], the main entry point for driving the
//! Claude Code CLI.
//!
//! # Example
//!
//! ```ignore
//! use claude_code::{ClaudeCode, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Simple one-shot request
//!     let client = ClaudeCode::new()?;
//!     let response = client.run_prompt("What is 2+2?").await?;
//!     println!("{response}");
//!
//!     // Streaming response
//!     use futures::StreamExt;
//!     let mut stream = client.stream_prompt("Write a haiku").await?;
//!     while let Some(line) = stream.next().await {
//!         println!("{}", line?);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::builder::validate_mcp_config;
use crate::config::{AuthBackend, ClientConfig, ClientConfigBuilder, OutputFormat};
use crate::conversation::{Conversation, ConversationBuilder};
use crate::process::{JsonStream, LineStream};
use crate::{Error, Result};

/// A client for driving the Claude Code CLI.
///
/// `ClaudeCode` is the main entry point. It holds the configuration and
/// provides:
/// - One-shot prompts ([`run_prompt`](Self::run_prompt), [`stream_prompt`](Self::stream_prompt))
/// - Multi-turn conversations ([`start_conversation`](Self::start_conversation),
///   [`conversation`](Self::conversation))
///
/// # Thread Safety
///
/// `ClaudeCode` is `Send + Sync` and cheap to clone; clones share the same
/// configuration. Each request spawns its own CLI process, so concurrent
/// requests are supported.
///
/// # Example
///
/// ```ignore
/// use claude_code::ClaudeCode;
///
/// let client = ClaudeCode::builder()
///     .api_key("sk-ant-...")
///     .model("claude-opus-4")
///     .build()?;
///
/// let response = client.run_prompt("Hello!").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ClaudeCode {
    config: Arc<ClientConfig>,
}

impl ClaudeCode {
    /// Create a new client with default configuration.
    ///
    /// The default backend is the Anthropic API with the key taken from
    /// `ANTHROPIC_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment does not provide the credentials
    /// the default backend needs.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ClaudeCode::new()?;
    /// ```
    pub fn new() -> Result<Self> {
        let config = ClientConfig::builder().build()?;
        Ok(Self::with_config(config))
    }

    /// Create a new client with the given configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = ClientConfig::builder()
    ///     .api_key("sk-ant-...")
    ///     .build()?;
    ///
    /// let client = ClaudeCode::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Create a builder for configuring a new client.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ClaudeCode::builder()
    ///     .api_key("sk-ant-...")
    ///     .allowed_tools(["Read", "Glob"])
    ///     .max_turns(10)
    ///     .build()?;
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Run a one-shot prompt and return the text response.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let response = client.run_prompt("What is 2+2?").await?;
    /// println!("{response}");
    /// ```
    pub async fn run_prompt(&self, prompt: &str) -> Result<String> {
        let mut conversation = self.conversation().start()?;
        conversation.send(prompt).await
    }

    /// Run a one-shot prompt with JSON output and parse the response.
    ///
    /// The CLI is asked for [`OutputFormat::Json`]. A response that does not
    /// parse is a [`Error::Validation`]: the tool ran fine, the caller asked
    /// for JSON.
    pub async fn run_prompt_json(&self, prompt: &str) -> Result<Value> {
        let mut conversation = self
            .conversation()
            .output_format(OutputFormat::Json)
            .start()?;
        let response = conversation.send(prompt).await?;

        serde_json::from_str(&response)
            .map_err(|err| Error::validation(format!("error parsing JSON response: {err}")))
    }

    /// Run a one-shot prompt and stream the response line by line.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned stream kills the subprocess.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures::StreamExt;
    ///
    /// let mut stream = client.stream_prompt("Write a poem").await?;
    /// while let Some(line) = stream.next().await {
    ///     println!("{}", line?);
    /// }
    /// ```
    pub async fn stream_prompt(&self, prompt: &str) -> Result<LineStream> {
        let mut conversation = self.conversation().start()?;
        conversation.stream(prompt).await
    }

    /// Run a one-shot prompt and stream the response as JSON records.
    ///
    /// The CLI is asked for [`OutputFormat::StreamJson`]; each non-blank
    /// output line is decoded as one JSON value.
    pub async fn stream_prompt_json(&self, prompt: &str) -> Result<JsonStream> {
        let mut conversation = self
            .conversation()
            .output_format(OutputFormat::StreamJson)
            .start()?;
        conversation.stream_json(prompt).await
    }

    /// Start a conversation with the client's settings.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut conversation = client.start_conversation()?;
    /// let a = conversation.send("My name is Alice").await?;
    /// let b = conversation.send("What's my name?").await?;
    /// ```
    pub fn start_conversation(&self) -> Result<Conversation> {
        self.conversation().start()
    }

    /// Begin building a conversation with per-conversation overrides.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut conversation = client
    ///     .conversation()
    ///     .model("claude-haiku-3-5")
    ///     .max_turns(3)
    ///     .start()?;
    /// ```
    pub fn conversation(&self) -> ConversationBuilder {
        ConversationBuilder::new(Arc::clone(&self.config))
    }

    /// Validate an MCP configuration file and use it for future requests.
    ///
    /// The file must exist, parse as JSON, and contain an `mcpServers` key.
    /// Conversations already started keep the configuration they were
    /// created with.
    pub fn load_mcp_config(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        validate_mcp_config(&path)?;
        Arc::make_mut(&mut self.config).mcp_config = Some(path);
        Ok(())
    }

    /// Get a reference to the client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Builder for [`ClaudeCode`].
///
/// This wraps [`ClientConfigBuilder`] and builds directly into a [`ClaudeCode`].
///
/// # Example
///
/// ```ignore
/// let client = ClaudeCode::builder()
///     .api_key("sk-ant-...")
///     .model("claude-opus-4")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    inner: ClientConfigBuilder,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self {
            inner: ClientConfigBuilder::default(),
        }
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is missing credentials or the tool
    /// lists contradict each other.
    pub fn build(self) -> Result<ClaudeCode> {
        let config = self.inner.build()?;
        Ok(ClaudeCode::with_config(config))
    }

    // -------------------------------------------------------------------------
    // Authentication (delegated to ClientConfigBuilder)
    // -------------------------------------------------------------------------

    /// Set the credential backend.
    pub fn backend(mut self, backend: AuthBackend) -> Self {
        self.inner = self.inner.backend(backend);
        self
    }

    /// Set the Anthropic API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.inner = self.inner.api_key(key);
        self
    }

    /// Set the AWS region or Cloud ML region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.inner = self.inner.region(region);
        self
    }

    /// Set the Google Cloud project ID.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.inner = self.inner.project_id(project_id);
        self
    }

    /// Set the model ID, in provider-specific format.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.inner = self.inner.model(model);
        self
    }

    // -------------------------------------------------------------------------
    // Tools configuration
    // -------------------------------------------------------------------------

    /// Set allowed tools (whitelist).
    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inner = self.inner.allowed_tools(tools);
        self
    }

    /// Set disallowed tools (blacklist).
    pub fn disallowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inner = self.inner.disallowed_tools(tools);
        self
    }

    // -------------------------------------------------------------------------
    // Conversation options
    // -------------------------------------------------------------------------

    /// Set the maximum number of turns per conversation.
    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.inner = self.inner.max_turns(max_turns);
        self
    }

    /// Path to MCP configuration file.
    pub fn mcp_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.mcp_config(path);
        self
    }

    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the claude CLI binary.
    pub fn cli_command(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.cli_command(path);
        self
    }

    /// Timeout for each CLI invocation.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.inner = self.inner.timeout(duration);
        self
    }
}
