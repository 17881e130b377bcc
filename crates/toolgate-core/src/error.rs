//! Error taxonomy for dispatch and tool execution

use thiserror::Error;

/// Errors a tool reports back to the dispatcher
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The arguments do not fit the tool; triggers the no-argument fallback
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool refused the input (e.g. a guarded SQL statement)
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Failed(String),
}

/// Every way a single dispatch can fail
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("No @keyword found. Available: {}", .keywords.join(", "))]
    NoKeyword { keywords: Vec<String> },

    #[error("Unknown keyword '@{keyword}'. Available: {}", .keywords.join(", "))]
    UnknownKeyword {
        keyword: String,
        keywords: Vec<String>,
    },

    #[error("Tool '{tool}' not found. Available tools: {}", .available.join(", "))]
    ToolNotFound { tool: String, available: Vec<String> },

    #[error("Arguments for tool '{tool}' do not match its parameters: {message}")]
    ArgumentAdaptation { tool: String, message: String },

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool '{tool}' is already registered")]
    DuplicateTool { tool: String },
}

impl DispatchError {
    /// Stable snake_case name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoKeyword { .. } => "no_keyword",
            DispatchError::UnknownKeyword { .. } => "unknown_keyword",
            DispatchError::ToolNotFound { .. } => "tool_not_found",
            DispatchError::ArgumentAdaptation { .. } => "argument_adaptation",
            DispatchError::ToolExecution { .. } => "tool_execution",
            DispatchError::DuplicateTool { .. } => "duplicate_tool",
        }
    }

    /// Valid keywords or tool names the caller can retry with, if any
    pub fn alternatives(&self) -> Option<(&'static str, &[String])> {
        match self {
            DispatchError::NoKeyword { keywords }
            | DispatchError::UnknownKeyword { keywords, .. } => Some(("keywords", keywords)),
            DispatchError::ToolNotFound { available, .. } => Some(("tools", available)),
            _ => None,
        }
    }
}
