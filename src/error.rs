//! Top-level error type the binary matches on to pick an exit code.
//! Each component keeps its own focused error enum (`ConfigError`,
//! `PlanError`, `SynthesisError`, `ExecutionError`); this one only exists
//! to let `main` wrap them with `?` and report a single, addressed cause.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not write reports to '{dir}': {source}")]
    ReportDirUnwritable {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not connect to {side}: {message}")]
    ConnectionFailed { side: &'static str, message: String },

    #[error("run was interrupted before completing")]
    Interrupted,
}

impl AppError {
    /// Exit code `main` reports to the shell. Kept centralized so the
    /// mapping is visible in one place instead of scattered `match`es.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::ReportDirUnwritable { .. } => 3,
            AppError::ConnectionFailed { .. } => 4,
            AppError::Interrupted => 130,
        }
    }
}
