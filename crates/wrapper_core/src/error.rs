//! Error types for the wrapper core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while comparing dotted version strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version component '{component}' in '{version}'")]
    InvalidComponent { version: String, component: String },
}

/// Top-level wrapper errors
#[derive(Error, Debug)]
pub enum WrapperError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Version error: {0}")]
    Version(#[from] VersionError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Command queue is full, dropped: {0}")]
    CommandQueueFull(String),
    #[error("Failed to launch server {0}: {1}")]
    Launch(PathBuf, String),
    #[error("World error: {0}")]
    World(String),
    #[error("Authorization directory error: {0}")]
    Directory(String),
    #[error("Matcher error: {0}")]
    Matcher(String),
}
