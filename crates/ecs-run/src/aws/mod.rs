//! AWS client modules
//!
//! Thin wrappers around the SDK clients this tool talks to:
//! - ECS: task definition registration, task launch and describe
//! - CloudWatch Logs: paginated log event retrieval

pub mod context;
pub mod ecs;
pub mod error;
pub mod logs;

pub use context::AwsContext;
pub use ecs::{EcsClient, LaunchTaskConfig, TaskOperations};
pub use error::{AwsError, LogFetchError, classify_aws_error, classify_sdk_error, find_aws_error};
pub use logs::{LogOperations, LogPage, LogRecord, LogsClient};
