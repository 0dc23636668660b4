//! Lifecycle Orchestrator
//!
//! Drives one task from registration to its final report:
//!
//! ```text
//! PROVISIONING --settled--> OBSERVING --stopped--> DRAINING --> DONE
//! ```
//!
//! Provisioning waits for the task to be RUNNING (or already STOPPED) and
//! reports the whole seconds slept, including the sleep after the describe
//! call that saw the task settle.
//! Observing alternates log pulls and describe calls. Once STOPPED has been
//! seen, one more drain pass (logs + describe) runs before the report is
//! built, because CloudWatch lags behind the task status.

use crate::aws::{LogFetchError, LogOperations, TaskOperations};
use crate::config::{PollConfig, RunConfig, TailConfig};
use crate::cursor::LogCursor;
use crate::error::RunError;
use crate::tracker::TaskTracker;
use ecs_run_common::defaults::NO_LOGS_NOTICE;
use ecs_run_common::template::load_template;
use ecs_run_common::{TaskDefinitionDoc, TaskDescription, TaskHandle, TerminationReport};
use rand::Rng;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Observer phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Provisioning,
    Observing,
    Draining,
    Done,
}

/// Leave provisioning once the task runs or has already stopped
fn provisioning_complete(tracker: &TaskTracker) -> bool {
    tracker.is_settled()
}

/// Start the drain pass once STOPPED has been observed
fn ready_to_drain(tracker: &TaskTracker) -> bool {
    tracker.is_terminal()
}

/// Uniformly random delay in `[0, ceiling]`
pub fn jittered_interval(ceiling: Duration) -> Duration {
    if ceiling.is_zero() {
        return Duration::ZERO;
    }
    let secs = rand::thread_rng().gen_range(0.0..=ceiling.as_secs_f64());
    Duration::from_secs_f64(secs)
}

pub struct Orchestrator<'a, T, L, W> {
    tasks: &'a T,
    logs: &'a L,
    out: W,
    poll: PollConfig,
    no_logs_reported: bool,
}

impl<'a, T, L, W> Orchestrator<'a, T, L, W>
where
    T: TaskOperations,
    L: LogOperations,
    W: Write,
{
    pub fn new(tasks: &'a T, logs: &'a L, out: W, poll: PollConfig) -> Self {
        Self {
            tasks,
            logs,
            out,
            poll,
            no_logs_reported: false,
        }
    }

    /// Render the template, register it, start the task and observe it
    pub async fn launch(
        &mut self,
        config: &RunConfig,
        vars: &HashMap<String, String>,
    ) -> Result<TerminationReport, RunError> {
        writeln!(
            self.out,
            "Step 2: Replace variables inside of {} \n",
            config.template_file.display()
        )?;
        let rendered = load_template(&config.template_file, vars)?;
        writeln!(self.out, "Task definition file: \n{rendered}")?;
        let definition = TaskDefinitionDoc::from_json(&rendered)?;

        writeln!(self.out, "Step 3: Registering task definition \n")?;
        let task_definition_arn = self
            .tasks
            .register(&definition)
            .await
            .map_err(RunError::Registration)?;
        writeln!(self.out, "Task definition arn: {task_definition_arn} \n")?;

        writeln!(self.out, "Step 4: Running task")?;
        self.out.flush()?;
        let task_arn = self
            .tasks
            .start(&config.launch_config(&task_definition_arn))
            .await
            .map_err(RunError::Launch)?;

        let target = &config.target;
        let handle = TaskHandle::new(
            &target.cluster,
            &target.app_name,
            task_definition_arn,
            task_arn,
        );
        let location = definition.log_location();
        if location.is_none() {
            warn!("First container has no awslogs group/stream prefix, logs cannot be tailed");
        }
        let cursor = LogCursor::for_task(location.as_ref(), &handle.app_name, &handle.task_id);

        self.observe(TaskTracker::new(handle), cursor, Phase::Provisioning)
            .await
    }

    /// Observe a task that was started elsewhere
    pub async fn attach(&mut self, config: &TailConfig) -> Result<TerminationReport, RunError> {
        let target = &config.target;
        let description = self.describe(&target.cluster, &config.task_arn).await?;

        let handle = TaskHandle::new(
            &target.cluster,
            &target.app_name,
            description.task_definition_arn.clone().unwrap_or_default(),
            &config.task_arn,
        );
        let cursor = LogCursor::for_task(
            Some(&config.log_location),
            &handle.app_name,
            &handle.task_id,
        );
        let mut tracker = TaskTracker::new(handle);
        tracker.refresh(description);

        writeln!(self.out, "\n======== TASK LOGS ========")?;
        self.observe(tracker, cursor, Phase::Observing).await
    }

    async fn observe(
        &mut self,
        mut tracker: TaskTracker,
        mut cursor: LogCursor,
        start: Phase,
    ) -> Result<TerminationReport, RunError> {
        let mut phase = start;
        let mut provisioning_secs = 0u64;

        while phase != Phase::Done {
            let next = match phase {
                Phase::Provisioning => {
                    self.refresh(&mut tracker).await?;
                    provisioning_secs += self.pause().await.as_secs();
                    if provisioning_complete(&tracker) {
                        writeln!(self.out, "Provisioning time: {provisioning_secs} seconds")?;
                        self.print_running_banner(tracker.handle())?;
                        Phase::Observing
                    } else {
                        Phase::Provisioning
                    }
                }
                Phase::Observing => {
                    self.pull_logs(&mut cursor).await?;
                    self.refresh(&mut tracker).await?;
                    self.pause().await;
                    if ready_to_drain(&tracker) {
                        Phase::Draining
                    } else {
                        Phase::Observing
                    }
                }
                Phase::Draining => {
                    self.pull_logs(&mut cursor).await?;
                    self.refresh(&mut tracker).await?;
                    Phase::Done
                }
                Phase::Done => Phase::Done,
            };

            if next != phase {
                debug!(from = %phase, to = %next, status = %tracker.status(), "Phase transition");
            }
            phase = next;
        }

        let report = tracker.termination_report();
        info!(
            task_id = %report.handle.task_id,
            exit_code = report.exit_code(),
            succeeded = report.succeeded(),
            "Task finished"
        );
        report.render(&mut self.out)?;
        self.out.flush()?;
        Ok(report)
    }

    async fn describe(&self, cluster: &str, task_arn: &str) -> Result<TaskDescription, RunError> {
        self.tasks
            .describe(cluster, task_arn)
            .await
            .map_err(|source| RunError::Query {
                task_arn: task_arn.to_string(),
                source,
            })
    }

    async fn refresh(&self, tracker: &mut TaskTracker) -> Result<(), RunError> {
        let handle = tracker.handle();
        let description = self.describe(&handle.cluster, &handle.task_arn).await?;
        tracker.refresh(description);
        Ok(())
    }

    /// Print whatever the stream gained since the last pull
    async fn pull_logs(&mut self, cursor: &mut LogCursor) -> Result<(), RunError> {
        if !cursor.is_active() {
            return self.report_no_logs();
        }

        let logs = self.logs;
        match cursor.poll(logs).await {
            Ok(batch) if batch.is_empty() => Ok(()),
            Ok(batch) => {
                debug!(records = batch.len(), "New log records");
                for record in batch {
                    writeln!(self.out, "{}", record.message)?;
                }
                self.out.flush()?;
                Ok(())
            }
            Err(e @ LogFetchError::StreamNotFound { .. }) => {
                debug!(error = %e, "Log stream not available yet");
                self.report_no_logs()
            }
            Err(e) => {
                warn!(error = ?e, "Failed to read task logs");
                self.report_no_logs()
            }
        }
    }

    fn report_no_logs(&mut self) -> Result<(), RunError> {
        if !self.no_logs_reported {
            self.no_logs_reported = true;
            writeln!(self.out, "{NO_LOGS_NOTICE}")?;
        }
        Ok(())
    }

    fn print_running_banner(&mut self, handle: &TaskHandle) -> Result<(), RunError> {
        writeln!(self.out, "\n======== RUNNING TASK ========")?;
        writeln!(self.out, "CLUSTER_NAME: {}", handle.cluster)?;
        writeln!(self.out, "APP_NAME:     {}", handle.app_name)?;
        writeln!(self.out, "TASK_DEF_ARN: {}", handle.task_definition_arn)?;
        writeln!(self.out, "TASK_ARN:     {}", handle.task_arn)?;
        writeln!(self.out, "\n======== TASK LOGS ========")?;
        self.out.flush()?;
        Ok(())
    }

    async fn pause(&self) -> Duration {
        let delay = jittered_interval(self.poll.jitter);
        tokio::time::sleep(delay).await;
        delay
    }
}

/// Write the report and its exit code as pretty JSON
pub fn write_report_file(path: &Path, report: &TerminationReport) -> Result<(), RunError> {
    let mut json = serde_json::to_value(report).map_err(std::io::Error::from)?;
    json["exit_code"] = serde_json::Value::from(report.exit_code());

    let mut file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, &json).map_err(std::io::Error::from)?;
    writeln!(file)?;
    info!(path = %path.display(), "Report written");
    Ok(())
}
