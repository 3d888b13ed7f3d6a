//! # claude-code
//!
//! Async Rust wrapper for the Claude Code CLI.
//!
//! This library provides a typed interface to Claude Code, supporting:
//! - One-shot prompts and multi-turn conversations
//! - Streaming responses as lines or decoded JSON records
//! - Three credential backends: Anthropic API, AWS Bedrock, Google Vertex AI
//! - Per-invocation timeouts with guaranteed subprocess cleanup
//!
//! ## Quick Start
//!
//! ```ignore
//! use claude_code::{ClaudeCode, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClaudeCode::new()?;
//!     let response = client.run_prompt("What is 2+2?").await?;
//!     println!("{response}");
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```ignore
//! use futures::StreamExt;
//! use claude_code::ClaudeCode;
//!
//! let client = ClaudeCode::new()?;
//! let mut stream = client.stream_prompt("Write a poem").await?;
//! while let Some(line) = stream.next().await {
//!     println!("{}", line?);
//! }
//! ```
//!
//! ## Multi-turn Conversations
//!
//! ```ignore
//! let mut conversation = client.start_conversation()?;
//! let _ = conversation.send("My name is Alice").await?;
//! let response = conversation.send("What's my name?").await?;
//! // Claude remembers: "Your name is Alice"
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! use std::time::Duration;
//! use claude_code::{AuthBackend, ClaudeCode};
//!
//! let client = ClaudeCode::builder()
//!     .backend(AuthBackend::AwsBedrock)
//!     .region("us-west-2")
//!     .allowed_tools(["Read", "Glob"])
//!     .timeout(Duration::from_secs(120))
//!     .build()?;
//! ```

mod client;
pub mod config;
mod conversation;
mod error;
pub mod process;

pub use error::{Error, Result};

// Re-export the main client types at crate root
pub use client::{ClaudeCode, ClientBuilder};
pub use conversation::{Conversation, ConversationBuilder, ENV_CONVERSATION_ID};

// Re-export commonly used config types at crate root
pub use config::{
    AuthBackend, AuthConfig, ClientConfig, ClientConfigBuilder, ConversationId, OutputFormat,
};

// Re-export commonly used process types at crate root
pub use process::{Invocation, InvocationOutput, JsonStream, LineStream};
