//! Error types for the module harness
//!
//! Only external-operation failures and pre-run problems are errors.
//! A pattern missing from the log is an ordinary failed assertion and
//! never travels through this type.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === External Operation Errors ===
    #[error("Operation '{operation}' failed with status {status}: {stderr}")]
    Execution {
        operation: String,
        status: i32,
        stderr: String,
    },

    // === Pre-flight Errors ===
    #[error("Module file {module}.ko not found (searched: {searched}). Please build and install the module first using 'make' & 'sudo make install'")]
    ArtifactMissing { module: String, searched: String },

    #[error("Required tool '{0}' not found in PATH")]
    ToolMissing(String),

    // === Suite Errors ===
    #[error("Unknown suite '{name}'. Available suites: {available}")]
    UnknownSuite { name: String, available: String },

    #[error("Invalid suite definition: {0}")]
    InvalidSuite(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an execution error for a failed external operation
    pub fn execution(operation: &str, status: i32, stderr: &str) -> Self {
        Self::Execution {
            operation: operation.to_string(),
            status,
            stderr: stderr.trim().to_string(),
        }
    }

    /// Create an artifact missing error with the searched locations
    pub fn artifact_missing<S: AsRef<str>>(module: &str, paths: &[S]) -> Self {
        Self::ArtifactMissing {
            module: module.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }
}
