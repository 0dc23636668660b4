//! ecs-run - one-off ECS task runner
//!
//! Registers a task definition rendered from a template, runs it, streams its
//! CloudWatch logs to stdout and turns the final container exit codes into the
//! process exit code.

pub mod aws;
pub mod config;
pub mod cursor;
pub mod error;
pub mod orchestrator;
pub mod tracker;
