//! Error types for the engine.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Model backend errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned an invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        last_error: Box<LlmError>,
    },

    #[error("Unknown model provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid retry settings: {0}")]
    InvalidRetryConfig(String),
}

/// Session store and approval errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Approval {0} not found")]
    ApprovalNotFound(Uuid),

    #[error("Session {session_id} has a pending tool approval ({approval_id})")]
    Conflict { session_id: Uuid, approval_id: Uuid },

    #[error("Session {session_id} uses workflow '{workflow}', which does not support this")]
    UnsupportedWorkflow { session_id: Uuid, workflow: String },
}

/// Plan-and-execute errors.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid plan request: {0}")]
    InvalidInput(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Planner model failed: {0}")]
    Llm(#[from] LlmError),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
