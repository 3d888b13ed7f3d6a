//! Authentication backends for the Claude CLI.
//!
//! The CLI reads credentials from environment variables, so authenticating
//! means choosing a backend and exporting the right variables into the
//! subprocess environment:
//!
//! - Anthropic API: an API key
//! - AWS Bedrock: a region (credentials come from the ambient AWS config)
//! - Google Vertex AI: a region and a project ID
//!
//! # Example
//!
//! ```ignore
//! use claude_code::config::{AuthBackend, AuthConfig};
//!
//! let mut auth = AuthConfig::new(AuthBackend::AwsBedrock);
//! auth.region = Some("us-west-2".into());
//! auth.validate()?;
//!
//! for (name, value) in auth.environment() {
//!     println!("{name}={value}");
//! }
//! ```

use std::collections::HashMap;

use crate::Result;

/// Environment variable name for the Anthropic API key.
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
/// Environment variable that switches the CLI to AWS Bedrock.
pub const ENV_USE_BEDROCK: &str = "CLAUDE_CODE_USE_BEDROCK";
/// Environment variable name for the AWS region.
pub const ENV_AWS_REGION: &str = "AWS_REGION";
/// Environment variable that switches the CLI to Google Vertex AI.
pub const ENV_USE_VERTEX: &str = "CLAUDE_CODE_USE_VERTEX";
/// Environment variable name for the Cloud ML region.
pub const ENV_CLOUD_ML_REGION: &str = "CLOUD_ML_REGION";
/// Environment variable name for the Vertex AI project ID.
pub const ENV_VERTEX_PROJECT_ID: &str = "ANTHROPIC_VERTEX_PROJECT_ID";
/// Environment variable name for the model override.
pub const ENV_MODEL: &str = "ANTHROPIC_MODEL";

/// Model used when neither the configuration nor the environment names one.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Which credential backend the CLI should authenticate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBackend {
    /// Authenticate with a direct Anthropic API key.
    AnthropicApi,
    /// Authenticate through AWS Bedrock.
    AwsBedrock,
    /// Authenticate through Google Vertex AI.
    GoogleVertex,
}

impl Default for AuthBackend {
    fn default() -> Self {
        AuthBackend::AnthropicApi
    }
}

/// Credentials and model selection for one backend.
///
/// Fields left as `None` can be filled from the process environment with
/// [`fill_from_env`](AuthConfig::fill_from_env); [`validate`](AuthConfig::validate)
/// checks that the chosen backend has what it needs.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// The credential backend to authenticate against.
    pub backend: AuthBackend,
    /// Anthropic API key (required for [`AuthBackend::AnthropicApi`]).
    pub api_key: Option<String>,
    /// AWS region or Cloud ML region (required for Bedrock and Vertex).
    pub region: Option<String>,
    /// Google Cloud project ID (required for [`AuthBackend::GoogleVertex`]).
    pub project_id: Option<String>,
    /// Model ID in provider-specific format.
    pub model: Option<String>,
}

impl AuthConfig {
    /// Create an empty configuration for the given backend.
    pub fn new(backend: AuthBackend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Check that the chosen backend has the fields it requires.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            AuthBackend::AnthropicApi => {
                if is_blank(&self.api_key) {
                    return Err(crate::Error::auth(
                        "API key is required for Anthropic API authentication",
                    ));
                }
            }
            AuthBackend::AwsBedrock => {
                if is_blank(&self.region) {
                    return Err(crate::Error::auth(
                        "region is required for AWS Bedrock authentication",
                    ));
                }
            }
            AuthBackend::GoogleVertex => {
                if is_blank(&self.region) {
                    return Err(crate::Error::auth(
                        "region is required for Google Vertex AI authentication",
                    ));
                }
                if is_blank(&self.project_id) {
                    return Err(crate::Error::auth(
                        "project ID is required for Google Vertex AI authentication",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Environment variables the subprocess needs to authenticate.
    pub fn environment(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        match self.backend {
            AuthBackend::AnthropicApi => {
                env.insert(
                    ENV_API_KEY.to_string(),
                    self.api_key.clone().unwrap_or_default(),
                );
            }
            AuthBackend::AwsBedrock => {
                env.insert(ENV_USE_BEDROCK.to_string(), "1".to_string());
                if let Some(region) = &self.region {
                    env.insert(ENV_AWS_REGION.to_string(), region.clone());
                }
            }
            AuthBackend::GoogleVertex => {
                env.insert(ENV_USE_VERTEX.to_string(), "1".to_string());
                if let Some(region) = &self.region {
                    env.insert(ENV_CLOUD_ML_REGION.to_string(), region.clone());
                }
                if let Some(project_id) = &self.project_id {
                    env.insert(ENV_VERTEX_PROJECT_ID.to_string(), project_id.clone());
                }
            }
        }

        if let Some(model) = &self.model {
            env.insert(ENV_MODEL.to_string(), model.clone());
        }

        env
    }

    /// Fill unset fields from the process environment.
    ///
    /// Only the variables the chosen backend uses are consulted. The model
    /// falls back to [`ENV_MODEL`] and then to [`DEFAULT_MODEL`], so after
    /// this call a model is always set.
    pub fn fill_from_env(&mut self) {
        self.fill_from_vars(|name| std::env::var(name).ok());
    }

    fn fill_from_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| var(name).filter(|value| !value.is_empty());

        match self.backend {
            AuthBackend::AnthropicApi => {
                if is_blank(&self.api_key) {
                    self.api_key = lookup(ENV_API_KEY);
                }
            }
            AuthBackend::AwsBedrock => {
                if is_blank(&self.region) {
                    self.region = lookup(ENV_AWS_REGION);
                }
            }
            AuthBackend::GoogleVertex => {
                if is_blank(&self.region) {
                    self.region = lookup(ENV_CLOUD_ML_REGION);
                }
                if is_blank(&self.project_id) {
                    self.project_id = lookup(ENV_VERTEX_PROJECT_ID);
                }
            }
        }

        if is_blank(&self.model) {
            self.model = Some(lookup(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()));
        }
    }
}

/// Unset and empty both count as missing, matching how the CLI treats its
/// own environment variables.
fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, str::is_empty)
}
