//! Error handling for the serial plotter
//!
//! This module defines the crate-wide error type and a Result alias for use
//! throughout the ingest pipeline. Parse failures of individual lines are not
//! represented here; they are recovered inside the read loop (see
//! [`crate::ingest::RecordError`]).

use std::time::Duration;
use thiserror::Error;

/// Main error type for serial plotter operations
#[derive(Error, Debug)]
pub enum PlotterError {
    /// A configuration field failed validation
    #[error("Invalid {field}: {message}")]
    Config {
        /// Name of the offending field (e.g. "capacity")
        field: &'static str,
        /// Human readable reason
        message: String,
    },

    /// Errors reported by the transport collaborator
    #[error("Transport error: {0}")]
    Transport(String),

    /// Errors from the serial port driver
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The transport did not accept a write within its deadline
    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// Operation not valid in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors raised by a renderer
    #[error("Render error: {0}")]
    Render(String),

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
        source: Box<PlotterError>,
    },
}

impl PlotterError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PlotterError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a configuration error for `field`
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        PlotterError::Config {
            field,
            message: message.into(),
        }
    }

    /// Whether this error (or the error it wraps) is a write timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            PlotterError::WriteTimeout(_) => true,
            PlotterError::WithContext { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Name of the invalid configuration field, if this is a config error
    pub fn config_field(&self) -> Option<&'static str> {
        match self {
            PlotterError::Config { field, .. } => Some(field),
            PlotterError::WithContext { source, .. } => source.config_field(),
            _ => None,
        }
    }
}

/// Result type alias for serial plotter operations
pub type Result<T> = std::result::Result<T, PlotterError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, toml::de::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PlotterError::Serialization(e.to_string()).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PlotterError::Serialization(e.to_string()).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlotterError::config("capacity", "must be a positive integer");
        assert_eq!(
            err.to_string(),
            "Invalid capacity: must be a positive integer"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = PlotterError::Transport("port vanished".to_string());
        let with_ctx = err.with_context("Failed to read");
        assert!(with_ctx.to_string().contains("Failed to read"));
        assert!(with_ctx.to_string().contains("port vanished"));
    }

    #[test]
    fn test_timeout_detection_through_context() {
        let err = PlotterError::WriteTimeout(Duration::from_secs(1)).with_context("send");
        assert!(err.is_timeout());
        assert!(!PlotterError::Transport("x".into()).is_timeout());
    }

    #[test]
    fn test_config_field() {
        let err = PlotterError::config("vertical_bound", "not a number").with_context("start");
        assert_eq!(err.config_field(), Some("vertical_bound"));
        assert_eq!(PlotterError::Channel("x".into()).config_field(), None);
    }
}
