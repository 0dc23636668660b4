//! Task identity and describe snapshots

use crate::container::ContainerResult;
use crate::status::TaskStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifiers of one started task instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHandle {
    pub task_definition_arn: String,
    pub task_arn: String,
    /// Last path segment of the task ARN
    pub task_id: String,
    pub cluster: String,
    /// Service/app name, also used to build the log stream name
    pub app_name: String,
}

impl TaskHandle {
    pub fn new(
        cluster: impl Into<String>,
        app_name: impl Into<String>,
        task_definition_arn: impl Into<String>,
        task_arn: impl Into<String>,
    ) -> Self {
        let task_arn = task_arn.into();
        Self {
            task_definition_arn: task_definition_arn.into(),
            task_id: task_id_from_arn(&task_arn).to_string(),
            task_arn,
            cluster: cluster.into(),
            app_name: app_name.into(),
        }
    }
}

/// Extract the task ID from a task ARN.
///
/// Works for both ARN formats:
/// `arn:aws:ecs:region:acct:task/<id>` and
/// `arn:aws:ecs:region:acct:task/<cluster>/<id>`.
pub fn task_id_from_arn(task_arn: &str) -> &str {
    task_arn.rsplit('/').next().unwrap_or(task_arn)
}

/// One `DescribeTasks` snapshot of a task
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDescription {
    pub status: TaskStatus,
    pub task_definition_arn: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stopped_reason: Option<String>,
    pub stop_code: Option<String>,
    pub containers: Vec<ContainerResult>,
}

impl TaskDescription {
    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}
