use crate::config::helpers::{parse_bool_env, parse_optional_env};
use crate::error::ConfigError;

/// Agent loop and plan executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Model calls allowed per loop run before giving up.
    pub max_iterations: usize,
    /// Default approval gating for new sessions.
    pub require_tool_approval: bool,
    /// Cap on executed plan steps.
    pub plan_max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            require_tool_approval: true,
            plan_max_steps: 10,
        }
    }
}

impl AgentConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_iterations: parse_optional_env("AGENT_MAX_ITERATIONS", defaults.max_iterations)?,
            require_tool_approval: parse_bool_env(
                "AGENT_REQUIRE_TOOL_APPROVAL",
                defaults.require_tool_approval,
            )?,
            plan_max_steps: parse_optional_env("PLAN_MAX_STEPS", defaults.plan_max_steps)?,
        };

        if config.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_ITERATIONS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.plan_max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PLAN_MAX_STEPS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(config)
    }
}
