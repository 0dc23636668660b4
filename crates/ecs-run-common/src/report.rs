//! Final stopped-task report

use crate::container::{ContainerResult, exit_code_for, first_failure};
use crate::status::TaskStatus;
use crate::task::{TaskDescription, TaskHandle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

/// Snapshot of a finished task, built once from the last describe call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    #[serde(flatten)]
    pub handle: TaskHandle,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stopped_reason: Option<String>,
    pub stop_code: Option<String>,
    pub containers: Vec<ContainerResult>,
}

impl TerminationReport {
    pub fn new(handle: TaskHandle, last: &TaskDescription) -> Self {
        Self {
            handle,
            status: last.status,
            started_at: last.started_at,
            stopped_at: last.stopped_at,
            stopped_reason: last.stopped_reason.clone(),
            stop_code: last.stop_code.clone(),
            containers: last.containers.clone(),
        }
    }

    /// First non-zero container exit code, or 0
    pub fn exit_code(&self) -> i32 {
        exit_code_for(&self.containers)
    }

    pub fn succeeded(&self) -> bool {
        first_failure(&self.containers).is_none()
    }

    /// Write the human-readable stopped-task block.
    ///
    /// Containers are listed in task order up to and including the first
    /// failed one; the success line is only written when none failed.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\n======== TASK STOPPED ========")?;
        writeln!(out, "Task ID:        {}", self.handle.task_id)?;
        writeln!(out, "Task ARN:       {}", self.handle.task_arn)?;
        writeln!(out, "Service Name:   {}", self.handle.app_name)?;
        writeln!(out, "Cluster Name:   {}", self.handle.cluster)?;
        if let Some(started_at) = self.started_at {
            writeln!(out, "Started at:     {started_at}")?;
        }
        writeln!(out, "Stopped at:     {}", display_or_unknown(self.stopped_at))?;
        writeln!(
            out,
            "Stopped Reason: {}",
            self.stopped_reason.as_deref().unwrap_or("unknown")
        )?;
        if let Some(stop_code) = &self.stop_code {
            writeln!(out, "Stop Code:      {stop_code}")?;
        }

        for container in &self.containers {
            if let Some(code) = container.exit_code {
                writeln!(out, "Exit code for container {}: {}", container.name, code)?;
                if code != 0 {
                    writeln!(
                        out,
                        "Container {} in task {} failed with exit code {}",
                        container.name, self.handle.task_arn, code
                    )?;
                    return Ok(());
                }
            }
            if let Some(reason) = &container.reason {
                writeln!(out, "Reason for container {}: {}", container.name, reason)?;
            }
        }

        writeln!(out, "All tasks completed successfully")
    }
}

fn display_or_unknown(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
