//! Error types for the swarm core

use thiserror::Error;
use tower::BoxError;

/// Result type alias for the swarm core
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Main error type for the swarm core
#[derive(Debug, Error)]
pub enum SwarmError {
    /// A tool's parameter signature could not be inspected.
    ///
    /// Raised when the tool is constructed, so a bad registration fails at
    /// startup instead of in the middle of a turn.
    #[error("Introspection error for tool `{tool}`: {reason}")]
    Introspection { tool: String, reason: String },

    /// Two tools of the same agent share a name
    #[error("Agent `{agent}` registers tool `{tool}` more than once")]
    DuplicateTool { agent: String, tool: String },

    /// The backend asked for a tool the active agent does not have
    #[error("Unknown tool `{tool}` requested from agent `{agent}`")]
    UnknownTool { agent: String, tool: String },

    /// A tool failed while running; the turn is aborted
    #[error("Tool `{tool}` failed for agent `{agent}`: {source}")]
    ToolExecution {
        agent: String,
        tool: String,
        #[source]
        source: BoxError,
    },

    /// A tool asked to end the whole session.
    ///
    /// This is not a failure: it is the explicit, user-authorized way for a
    /// tool (e.g. a human escalation) to stop the conversation. Embedders
    /// decide whether that means exiting the process.
    #[error("Session aborted by tool `{tool}` of agent `{agent}`: {reason}")]
    SessionAborted {
        agent: String,
        tool: String,
        reason: String,
    },

    /// The inference call itself failed
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),

    /// The configured iteration limit was hit before the backend stopped asking for tools
    #[error("Maximum iterations exceeded: {max_iterations}")]
    MaxIterationsExceeded { max_iterations: usize },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SwarmError {
    /// Whether this error is the deliberate abort-session signal rather than a failure.
    pub fn is_session_abort(&self) -> bool {
        matches!(self, SwarmError::SessionAborted { .. })
    }

    /// Wrap any backend failure.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        SwarmError::Backend(err.into())
    }
}

impl From<async_openai::error::OpenAIError> for SwarmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        SwarmError::Backend(Box::new(err))
    }
}
