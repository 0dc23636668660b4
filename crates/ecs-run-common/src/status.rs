//! ECS task lifecycle status
//!
//! Mirrors the `lastStatus` values reported by `DescribeTasks`. ECS moves a
//! task forward through these states; only `Running` and `Stopped` change
//! what the observer does.

use serde::Serialize;

/// Last known status of an ECS task
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Capacity is being provisioned (e.g. ENI attachment)
    #[default]
    Provisioning,
    /// Waiting for the container agent to pull and start containers
    Pending,
    Activating,
    /// Containers are running
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    /// All containers have exited
    Stopped,
    Deleted,
}

impl TaskStatus {
    /// Parse an ECS `lastStatus` string, returning None for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Check if the task has stopped for good
    pub fn is_terminal(self) -> bool {
        self == Self::Stopped
    }

    /// Check if the task's containers are running
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}
