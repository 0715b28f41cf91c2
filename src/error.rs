//! Error handling for botflow
//!
//! Each subsystem has its own error enum (`GraphError`, `ExecutionError`);
//! `BotflowError` wraps them for callers that cross subsystem boundaries
//! (configuration, workflow files, the CLI).

use crate::execution::ExecutionError;
use crate::graph::GraphError;
use thiserror::Error;

/// Main error type for botflow operations
#[derive(Error, Debug)]
pub enum BotflowError {
    /// Graph editing or snapshot errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Errors talking to the remote executor
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors loading a kinematic model or decoding telemetry
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BotflowError>,
    },
}

impl BotflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BotflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for BotflowError {
    fn from(err: serde_json::Error) -> Self {
        BotflowError::Serialization(err.to_string())
    }
}

/// Result type alias for botflow operations
pub type Result<T> = std::result::Result<T, BotflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BotflowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn test_error_display() {
        let err = BotflowError::Config("missing executor url".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing executor url");
    }

    #[test]
    fn test_error_with_context() {
        let err = BotflowError::Telemetry("bad model".to_string());
        let with_ctx = err.with_context("Failed to load so101.json");
        assert!(with_ctx.to_string().contains("Failed to load so101.json"));
        assert!(with_ctx.to_string().contains("bad model"));
    }

    #[test]
    fn test_graph_error_converts() {
        let result: std::result::Result<(), GraphError> =
            Err(GraphError::UnknownNode(NodeId::from("n1")));
        let err = result.context("Adding edge").unwrap_err();
        assert!(matches!(err, BotflowError::WithContext { .. }));
        assert!(err.to_string().starts_with("Adding edge: Graph error"));
    }

    #[test]
    fn test_execution_error_converts() {
        let err: BotflowError = ExecutionError::EmptyGraph.into();
        assert!(matches!(err, BotflowError::Execution(_)));
    }
}
