use std::path::PathBuf;

use thiserror::Error;

use crate::kernel::scheduler::Authority;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum PathwayError {
    #[error("failed to read pathway file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pathway data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("console gateway I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to render record: {0}")]
    Render(#[from] serde_json::Error),
}

/// Raised when a component tries to drive the turn scheduler without holding it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{requested:?} tried to arm a turn while {holder:?} holds the scheduler")]
pub struct SchedulerError {
    pub requested: Authority,
    pub holder: Option<Authority>,
}
