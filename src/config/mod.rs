//! Configuration and authentication for the Claude CLI client.
//!
//! This module provides:
//!
//! - [`ClientConfig`] and [`ClientConfigBuilder`] for configuring the client
//! - [`AuthBackend`] and [`AuthConfig`] for credential backends
//! - [`OutputFormat`] for response formats
//! - Built-in tool constants in [`tools`]
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
//!     .timeout(Duration::from_secs(120))
//!     .build()?;
//! ```
//!
//! # Authentication
//!
//! Three credential backends are supported:
//!
//! ```ignore
//! use claude_code::config::{AuthBackend, ClientConfig};
//!
//! // Anthropic API (default); the key may also come from ANTHROPIC_API_KEY
//! let config = ClientConfig::builder()
//!     .api_key("sk-ant-...")
//!     .build()?;
//!
//! // AWS Bedrock
//! let config = ClientConfig::builder()
//!     .backend(AuthBackend::AwsBedrock)
//!     .region("us-west-2")
//!     .build()?;
//!
//! // Google Vertex AI
//! let config = ClientConfig::builder()
//!     .backend(AuthBackend::GoogleVertex)
//!     .region("us-east5")
//!     .project_id("my-project")
//!     .build()?;
//! ```

pub mod auth;
pub mod builder;
pub mod options;

// Re-export commonly used types
pub use auth::{AuthBackend, AuthConfig, DEFAULT_MODEL, ENV_API_KEY, ENV_MODEL};
pub use builder::{ClientConfig, ClientConfigBuilder};
pub use options::{join_tools, parse_tools, tools, ConversationId, OutputFormat};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_exports_accessible() {
        // Verify all public types are accessible
        let _: AuthBackend = AuthBackend::AnthropicApi;
        let _: AuthConfig = AuthConfig::default();
        let _: OutputFormat = OutputFormat::Text;
        let _: ConversationId = ConversationId::new("test");

        // Verify tool constants are accessible
        let _: &str = tools::READ;
        let _: &str = tools::BASH;
    }

    #[test]
    fn builder_accessible() {
        // Should be able to create a builder
        let _ = ClientConfig::builder();
    }
}
