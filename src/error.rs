//! Error types for ipgeo
//!
//! This module defines custom error types using thiserror for better error handling.
//! Per-query failures never surface as `GeoError` to callers of the resolver; they are
//! folded into [`crate::database::LookupOutcome`] values by the coordinator.

use crate::database::AddressFamily;
use thiserror::Error;

/// Main error type for ipgeo
#[derive(Error, Debug)]
pub enum GeoError {
    /// Database file not found
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Database parsing error
    #[error("Database parse error: {0}")]
    ParseError(String),

    /// No file is loaded for the requested address family
    #[error("address-family database not loaded ({0})")]
    FamilyNotLoaded(AddressFamily),

    /// Database corrupted
    #[error("Database corrupted: {0}")]
    DatabaseCorrupted(String),

    /// Index out of bounds
    #[error("Index out of bounds: offset={0}, size={1}")]
    IndexOutOfBounds(usize, usize),

    /// MaxMind DB decoder error
    #[error("MaxMind DB error: {0}")]
    MaxMind(#[from] maxminddb::MaxMindDBError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for ipgeo
pub type Result<T> = std::result::Result<T, GeoError>;

impl GeoError {
    /// Create a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        GeoError::ParseError(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        GeoError::ConfigError(msg.into())
    }

    /// Create a corruption error
    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        GeoError::DatabaseCorrupted(msg.into())
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for GeoError {
    fn from(err: anyhow::Error) -> Self {
        GeoError::Other(err.to_string())
    }
}

/// Convert from TryFromSliceError
impl From<std::array::TryFromSliceError> for GeoError {
    fn from(err: std::array::TryFromSliceError) -> Self {
        GeoError::ParseError(format!("Failed to convert byte slice: {}", err))
    }
}
