use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid page url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("step {step} targets unknown element {target}")]
    UnknownTarget { step: usize, target: String },
    #[error("step {step} cannot run: {message}")]
    InvalidStep { step: usize, message: String },
}

impl Error {
    /// Configuration and scenario errors come from user input; telemetry
    /// failures come from the process environment.
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Scenario(_))
    }
}
