//! Run-level errors
//!
//! Every variant ends the process with exit code 1. A failed container is not
//! an error: it is reported through the termination report's exit code.

use crate::config::ConfigError;
use ecs_run_common::TemplateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to prepare task definition")]
    Template(#[from] TemplateError),

    #[error("Register task definition issue")]
    Registration(#[source] anyhow::Error),

    #[error("Failed to start task")]
    Launch(#[source] anyhow::Error),

    /// Describe failed; not retried
    #[error("Error getting running task {task_arn}")]
    Query {
        task_arn: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write output")]
    Output(#[from] std::io::Error),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
