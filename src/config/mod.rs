//! Configuration, resolved from the environment.
//!
//! `main` loads `.env` through `dotenvy` first, so values there behave
//! exactly like real environment variables.

mod agent;
mod helpers;
mod llm;

pub use agent::AgentConfig;
pub use llm::LlmConfig;

use crate::error::ConfigError;

/// Full engine configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
}

impl Config {
    /// Resolve every section from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            agent: AgentConfig::resolve()?,
            llm: LlmConfig::resolve()?,
        })
    }
}
