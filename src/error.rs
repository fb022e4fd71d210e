//! Error types for diskmap
//!
//! Provides structured error types for tool invocation, discovery,
//! snapshot persistence, resolution and locate-indicator control.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for diskmap
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // External Tool Errors
    // =========================================================================
    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("External tool failed: {tool} - {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("External tool unresponsive: {tool} did not finish within {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },

    // =========================================================================
    // Discovery Errors
    // =========================================================================
    #[error("Controller not found: {controller}")]
    ControllerNotFound { controller: u32 },

    // =========================================================================
    // Resolution Errors
    // =========================================================================
    #[error("No such enclosure: {token}")]
    EnclosureNotFound { token: String },

    #[error("Nothing matches: {token}")]
    NoMatch { token: String },

    #[error("Unknown layout glyph: {glyph}")]
    UnknownGlyph { glyph: String },

    // =========================================================================
    // Indicator Errors
    // =========================================================================
    #[error("Locate indicator failed for {controller}:{enclosure_index}:{slot}: {reason}")]
    IndicatorFailed {
        controller: u32,
        enclosure_index: u32,
        slot: u32,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // =========================================================================
    // Snapshot Errors
    // =========================================================================
    #[error("Snapshot load failed: {path} - {reason}")]
    SnapshotLoad { path: String, reason: String },

    #[error("Snapshot save failed: {path} - {reason}")]
    SnapshotSave { path: String, reason: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error comes from an external tool invocation
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Error::ToolNotFound { .. } | Error::ToolFailed { .. } | Error::ToolTimeout { .. }
        )
    }

    /// Check if the caller can recover by rediscovering the topology
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SnapshotLoad { .. } | Error::JsonParse(_) | Error::ToolTimeout { .. }
        )
    }
}

/// Result type alias for diskmap
pub type Result<T> = std::result::Result<T, Error>;
