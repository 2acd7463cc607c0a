//! Error types for the example runner

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server did not answer {url} within {timeout:?} ({attempts} attempts)")]
    ServerHealthCheck {
        url: String,
        timeout: Duration,
        attempts: usize,
    },

    #[error("Failed to spawn renderer {program}: {source}")]
    RendererSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn example {path}: {source}")]
    ExampleSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer output is not a valid report: {0}")]
    ReportParse(String),

    #[error("Cannot enumerate examples in {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
