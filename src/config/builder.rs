//! Client configuration and builder.
//!
//! This module provides the builder pattern for configuring the Claude CLI client.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use claude_code::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .api_key("sk-ant-...")
//!     .allowed_tools(["Read", "Glob"])
//!     .max_turns(10)
//!     .timeout(Duration::from_secs(120))
//!     .build()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use super::auth::{AuthBackend, AuthConfig};
use crate::{Error, Result};

/// Configuration for the Claude CLI client.
///
/// Use [`ClientConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // Authentication
    pub(crate) auth: AuthConfig,

    // Tools configuration
    pub(crate) allowed_tools: Vec<String>,
    pub(crate) disallowed_tools: Vec<String>,

    // Conversation options
    pub(crate) max_turns: Option<u32>,
    pub(crate) mcp_config: Option<PathBuf>,

    // Process options
    pub(crate) cli_command: Option<PathBuf>,
    pub(crate) timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a new builder for ClientConfig.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Get the authentication configuration.
    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    /// Get the model, if one is configured.
    pub fn model(&self) -> Option<&str> {
        self.auth.model.as_deref()
    }

    /// Get the allowed tool list (empty means no restriction).
    pub fn allowed_tools(&self) -> &[String] {
        &self.allowed_tools
    }

    /// Get the disallowed tool list (empty means no restriction).
    pub fn disallowed_tools(&self) -> &[String] {
        &self.disallowed_tools
    }

    /// Get the turn limit if set.
    pub fn max_turns(&self) -> Option<u32> {
        self.max_turns
    }

    /// Get the MCP configuration path if set.
    pub fn mcp_config(&self) -> Option<&Path> {
        self.mcp_config.as_deref()
    }

    /// Get the timeout if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the CLI command, or default to "claude".
    pub(crate) fn cli_command(&self) -> &str {
        self.cli_command
            .as_ref()
            .and_then(|p| p.to_str())
            .unwrap_or("claude")
    }
}

/// Builder for [`ClientConfig`].
///
/// This builder validates the configuration when
/// [`build()`](ClientConfigBuilder::build) is called: authentication fields
/// are filled from the environment where unset, then checked against the
/// chosen backend, and the tool lists are checked for contradictions.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    auth: AuthConfig,
    allowed_tools: Vec<String>,
    disallowed_tools: Vec<String>,
    max_turns: Option<u32>,
    mcp_config: Option<PathBuf>,
    cli_command: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------

    /// Set the credential backend (default: the Anthropic API).
    pub fn backend(mut self, backend: AuthBackend) -> Self {
        self.auth.backend = backend;
        self
    }

    /// Set the Anthropic API key (passed as ANTHROPIC_API_KEY to the subprocess).
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.auth.api_key = Some(key.into());
        self
    }

    /// Set the AWS region or Cloud ML region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.auth.region = Some(region.into());
        self
    }

    /// Set the Google Cloud project ID.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.auth.project_id = Some(project_id.into());
        self
    }

    /// Set the model ID, in provider-specific format.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.auth.model = Some(model.into());
        self
    }

    // -------------------------------------------------------------------------
    // Tools configuration
    // -------------------------------------------------------------------------

    /// Set allowed tools (whitelist).
    ///
    /// Only these tools will be available. Use constants from
    /// [`crate::config::tools`].
    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set disallowed tools (blacklist).
    ///
    /// These tools will not be available. Use constants from
    /// [`crate::config::tools`].
    pub fn disallowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.disallowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    // -------------------------------------------------------------------------
    // Conversation options
    // -------------------------------------------------------------------------

    /// Set the maximum number of turns per conversation.
    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Path to an MCP configuration file.
    ///
    /// The file is not read here; use
    /// [`ClaudeCode::load_mcp_config`](crate::ClaudeCode::load_mcp_config)
    /// to validate it up front.
    pub fn mcp_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.mcp_config = Some(path.into());
        self
    }

    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the claude CLI binary (default: search PATH for "claude").
    pub fn cli_command(mut self, path: impl Into<PathBuf>) -> Self {
        self.cli_command = Some(path.into());
        self
    }

    /// Timeout for each CLI invocation.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// Unset authentication fields are filled from the environment first, so
    /// an API key exported as ANTHROPIC_API_KEY does not need to be repeated
    /// here. Validation covers:
    /// - the chosen backend has the credentials it needs
    /// - no tool is both allowed and disallowed
    /// - the turn limit, if set, is at least 1
    ///
    /// Note: CLI existence is checked lazily at spawn time.
    pub fn build(self) -> Result<ClientConfig> {
        let mut auth = self.auth;
        auth.fill_from_env();
        auth.validate()?;

        check_tool_overlap(&self.allowed_tools, &self.disallowed_tools)?;

        if self.max_turns == Some(0) {
            return Err(Error::validation("max_turns must be at least 1"));
        }

        Ok(ClientConfig {
            auth,
            allowed_tools: self.allowed_tools,
            disallowed_tools: self.disallowed_tools,
            max_turns: self.max_turns,
            mcp_config: self.mcp_config,
            cli_command: self.cli_command,
            timeout: self.timeout,
        })
    }
}

/// Reject tool lists that both allow and disallow the same tool.
pub(crate) fn check_tool_overlap(allowed: &[String], disallowed: &[String]) -> Result<()> {
    let overlap: Vec<&str> = allowed
        .iter()
        .filter(|tool| disallowed.contains(tool))
        .map(String::as_str)
        .collect();

    if overlap.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "tools cannot be both allowed and disallowed: {}",
            overlap.join(", ")
        )))
    }
}

/// Check that an MCP configuration file exists, parses as JSON, and carries
/// an `mcpServers` key.
pub(crate) fn validate_mcp_config(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::validation(format!(
            "MCP configuration file not found: {}",
            path.display()
        )));
    }

    let raw = std::fs::read_to_string(path).map_err(|err| {
        Error::validation(format!(
            "could not read MCP configuration file {}: {err}",
            path.display()
        ))
    })?;

    let config: Value = serde_json::from_str(&raw).map_err(|_| {
        Error::validation(format!(
            "invalid JSON in MCP configuration file: {}",
            path.display()
        ))
    })?;

    let has_servers = config
        .as_object()
        .is_some_and(|obj| obj.contains_key("mcpServers"));
    if !has_servers {
        return Err(Error::validation(format!(
            "invalid MCP configuration file: {}",
            path.display()
        )));
    }

    Ok(())
}
