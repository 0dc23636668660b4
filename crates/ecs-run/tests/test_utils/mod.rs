//! Scripted stand-ins for the ECS and CloudWatch Logs clients
//!
//! Both fakes append to one shared journal so tests can assert on the
//! interleaving of describe and log calls.

#![allow(dead_code)]

use ecs_run::aws::{LaunchTaskConfig, LogFetchError, LogOperations, LogPage, LogRecord, TaskOperations};
use ecs_run::config::{EnvArgs, RunConfig};
use ecs_run_common::{ContainerResult, TaskDefinitionDoc, TaskDescription, TaskStatus};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub const TASK_DEF_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:task-definition/worker:1";
pub const TASK_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:task/prod/abc123";

pub const TEMPLATE: &str = r#"{
  "family": "${APP_NAME}",
  "containerDefinitions": [
    {
      "name": "${APP_NAME}",
      "image": "example/${APP_NAME}:${IMAGE_TAG}",
      "logConfiguration": {
        "logDriver": "awslogs",
        "options": {
          "awslogs-group": "/ecs/${CLUSTER_NAME}/${APP_NAME}",
          "awslogs-stream-prefix": "ecs"
        }
      }
    }
  ]
}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register { family: String },
    Start { task_definition_arn: String },
    /// Status returned, None when the describe failed
    Describe(Option<TaskStatus>),
    Fetch {
        group: String,
        stream: String,
        token: Option<String>,
        from_head: bool,
    },
}

/// Calls in order, stamped with the (possibly paused) tokio clock
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<(Instant, Call)>>>);

impl Journal {
    fn record(&self, call: Call) {
        self.0.lock().unwrap().push((Instant::now(), call));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.timed_calls().into_iter().map(|(_, call)| call).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

/// ECS fake that replays describe results in order, then repeats the last one
pub struct FakeTasks {
    journal: Journal,
    describes: Mutex<VecDeque<Result<TaskDescription, String>>>,
    last: Mutex<Option<TaskDescription>>,
    register_error: Option<String>,
    start_error: Option<String>,
}

impl FakeTasks {
    pub fn new(journal: &Journal, describes: Vec<Result<TaskDescription, String>>) -> Self {
        Self {
            journal: journal.clone(),
            describes: Mutex::new(describes.into()),
            last: Mutex::default(),
            register_error: None,
            start_error: None,
        }
    }

    pub fn failing_registration(journal: &Journal, message: &str) -> Self {
        Self {
            register_error: Some(message.to_string()),
            ..Self::new(journal, vec![])
        }
    }

    pub fn failing_start(journal: &Journal, message: &str) -> Self {
        Self {
            start_error: Some(message.to_string()),
            ..Self::new(journal, vec![])
        }
    }
}

impl TaskOperations for FakeTasks {
    async fn register(&self, definition: &TaskDefinitionDoc) -> anyhow::Result<String> {
        self.journal.record(Call::Register {
            family: definition.family.clone(),
        });
        match &self.register_error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(TASK_DEF_ARN.to_string()),
        }
    }

    async fn start(&self, config: &LaunchTaskConfig) -> anyhow::Result<String> {
        self.journal.record(Call::Start {
            task_definition_arn: config.task_definition_arn.clone(),
        });
        match &self.start_error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(TASK_ARN.to_string()),
        }
    }

    async fn describe(&self, _cluster: &str, _task_arn: &str) -> anyhow::Result<TaskDescription> {
        let next = self.describes.lock().unwrap().pop_front();
        let result = match next {
            Some(Ok(description)) => {
                *self.last.lock().unwrap() = Some(description.clone());
                Ok(description)
            }
            Some(Err(message)) => Err(anyhow::anyhow!("{message}")),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("describe script is empty")),
        };
        self.journal
            .record(Call::Describe(result.as_ref().ok().map(|d| d.status)));
        result
    }
}

/// CloudWatch Logs fake that replays pages in order
pub struct FakeLogs {
    journal: Journal,
    pages: Mutex<VecDeque<Result<LogPage, LogFetchError>>>,
    stream_missing: bool,
}

impl FakeLogs {
    pub fn new(journal: &Journal, pages: Vec<Result<LogPage, LogFetchError>>) -> Self {
        Self {
            journal: journal.clone(),
            pages: Mutex::new(pages.into()),
            stream_missing: false,
        }
    }

    /// A stream that never gets created
    pub fn missing(journal: &Journal) -> Self {
        Self {
            stream_missing: true,
            ..Self::new(journal, vec![])
        }
    }
}

impl LogOperations for FakeLogs {
    async fn fetch(
        &self,
        group: &str,
        stream: &str,
        token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogFetchError> {
        self.journal.record(Call::Fetch {
            group: group.to_string(),
            stream: stream.to_string(),
            token: token.map(str::to_string),
            from_head,
        });
        if let Some(page) = self.pages.lock().unwrap().pop_front() {
            return page;
        }
        if self.stream_missing {
            return Err(LogFetchError::StreamNotFound {
                group: group.to_string(),
                stream: stream.to_string(),
            });
        }
        Ok(LogPage {
            records: vec![],
            next_token: token.map(str::to_string),
        })
    }
}

pub fn page(messages: &[&str], next: &str) -> Result<LogPage, LogFetchError> {
    Ok(LogPage {
        records: messages
            .iter()
            .map(|m| LogRecord::new(Some(1_714_564_800_000), *m))
            .collect(),
        next_token: Some(next.to_string()),
    })
}

pub fn status(status: TaskStatus) -> Result<TaskDescription, String> {
    Ok(TaskDescription {
        task_definition_arn: Some(TASK_DEF_ARN.to_string()),
        ..TaskDescription::with_status(status)
    })
}

pub fn stopped(exit_codes: &[(&str, Option<i32>)]) -> Result<TaskDescription, String> {
    Ok(TaskDescription {
        status: TaskStatus::Stopped,
        task_definition_arn: Some(TASK_DEF_ARN.to_string()),
        stopped_reason: Some("Essential container in task exited".to_string()),
        containers: exit_codes
            .iter()
            .map(|(name, code)| ContainerResult::new(*name, *code))
            .collect(),
        ..Default::default()
    })
}

pub fn env_args(template_file: &Path) -> EnvArgs {
    EnvArgs {
        cluster_name: Some("prod".to_string()),
        app_name: Some("worker".to_string()),
        region: Some("us-east-1".to_string()),
        service_type: Some("FARGATE".to_string()),
        subnets: vec!["subnet-a".to_string()],
        security_groups: vec!["sg-1".to_string()],
        template_file: template_file.to_path_buf(),
        report_file: None,
    }
}

/// Write `content` as the template file and build a run config pointing at it
pub fn run_config(dir: &Path, content: &str) -> RunConfig {
    let path: PathBuf = dir.join("task-definition.tpl.json");
    std::fs::write(&path, content).unwrap();
    RunConfig::from_args(&env_args(&path)).unwrap()
}

pub fn template_vars() -> HashMap<String, String> {
    [
        ("CLUSTER_NAME", "prod"),
        ("APP_NAME", "worker"),
        ("IMAGE_TAG", "v42"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
