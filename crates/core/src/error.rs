//! Error types for the shellpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the union the
//! orchestration layer returns.

use thiserror::Error;

/// The top-level error type for all shellpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model call errors (fatal to one conversation loop) ---
    #[error("Model call failed: {0}")]
    ModelCall(#[from] ProviderError),

    // --- Planning errors (fatal to plan generation) ---
    #[error("Failed to parse plan: {0}")]
    PlanParse(String),

    // --- Step errors (recorded, never abort a plan) ---
    #[error("Step {step} failed: {reason}")]
    StepExecution { step: u32, reason: String },

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Interactive input ---
    #[error("Prompt error: {0}")]
    Prompt(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{tool_name} timed out after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
