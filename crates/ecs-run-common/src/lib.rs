//! ecs-run-common - Shared types for running and observing ECS tasks
//!
//! This crate holds the domain types used by the `ecs-run` binary, without
//! any AWS SDK dependencies so the lifecycle logic stays easy to test.
//!
//! ## Modules
//!
//! - [`container`]: Per-container results and exit code derivation
//! - [`defaults`]: Default configuration values
//! - [`report`]: Final stopped-task report
//! - [`status`]: ECS task lifecycle status
//! - [`task`]: Task handle and describe snapshots
//! - [`task_definition`]: Task definition document model and log location
//! - [`template`]: `$VAR` substitution for task definition templates

pub mod container;
pub mod defaults;
pub mod report;
pub mod status;
pub mod task;
pub mod task_definition;
pub mod template;

// Re-export commonly used types
pub use container::{ContainerResult, exit_code_for, first_failure};
pub use report::TerminationReport;
pub use status::TaskStatus;
pub use task::{TaskDescription, TaskHandle, task_id_from_arn};
pub use task_definition::{LogLocation, TaskDefinitionDoc};
pub use template::{TemplateError, render_template};
