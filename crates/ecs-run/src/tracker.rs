//! Task State Tracker
//!
//! Owns the handle and latest known status of the one task being observed.
//! Fed only by describe results; does no I/O itself.

use ecs_run_common::{TaskDescription, TaskHandle, TaskStatus, TerminationReport};
use tracing::info;

#[derive(Debug, Clone)]
pub struct TaskTracker {
    handle: TaskHandle,
    status: TaskStatus,
    last: Option<TaskDescription>,
}

impl TaskTracker {
    /// A freshly started task is assumed to be provisioning
    pub fn new(handle: TaskHandle) -> Self {
        Self {
            handle,
            status: TaskStatus::Provisioning,
            last: None,
        }
    }

    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Record a describe result
    pub fn refresh(&mut self, description: TaskDescription) {
        if description.status != self.status {
            info!(
                task_id = %self.handle.task_id,
                from = %self.status,
                to = %description.status,
                "Task status changed"
            );
        }
        self.status = description.status;
        self.last = Some(description);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Provisioning is over once the task runs or has already stopped
    pub fn is_settled(&self) -> bool {
        self.is_running() || self.is_terminal()
    }

    /// Report built from the last describe call
    pub fn termination_report(&self) -> TerminationReport {
        let fallback;
        let last = match &self.last {
            Some(last) => last,
            None => {
                fallback = TaskDescription::with_status(self.status);
                &fallback
            }
        };
        TerminationReport::new(self.handle.clone(), last)
    }
}
