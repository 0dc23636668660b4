//! ECS task management

use super::error::classify_sdk_error;
use anyhow::{Context, Result};
use aws_sdk_ecs::{
    Client,
    primitives::DateTime as AwsDateTime,
    types::{
        AwsVpcConfiguration, Compatibility, Container, ContainerDefinition, KeyValuePair,
        LaunchType, LogConfiguration, LogDriver, NetworkConfiguration, NetworkMode, PortMapping,
        Secret, Task, TransportProtocol,
    },
};
use chrono::{DateTime, Utc};
use ecs_run_common::task_definition::ContainerDefinitionDoc;
use ecs_run_common::{ContainerResult, TaskDefinitionDoc, TaskDescription, TaskStatus};
use tracing::{debug, info, warn};

use super::AwsContext;

/// Parameters for starting one task
#[derive(Debug, Clone, Default)]
pub struct LaunchTaskConfig {
    pub cluster: String,
    pub task_definition_arn: String,
    /// `FARGATE`, `EC2` or `EXTERNAL`; ECS picks the cluster default when None
    pub launch_type: Option<String>,
    /// awsvpc subnets; network configuration is only sent when non-empty
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
}

/// Remote task operations, abstracted so the lifecycle logic can be tested
/// without ECS.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait TaskOperations: Send + Sync {
    /// Register a new task definition revision, returning its ARN
    async fn register(&self, definition: &TaskDefinitionDoc) -> Result<String>;

    /// Start one task, returning its task ARN
    async fn start(&self, config: &LaunchTaskConfig) -> Result<String>;

    /// Fetch the current state of a task
    async fn describe(&self, cluster: &str, task_arn: &str) -> Result<TaskDescription>;
}

/// ECS client for registering and running one-off tasks
pub struct EcsClient {
    client: Client,
}

impl EcsClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ecs_client(),
        }
    }

    pub async fn register_task_definition(&self, definition: &TaskDefinitionDoc) -> Result<String> {
        let containers = definition
            .container_definitions
            .iter()
            .map(container_definition)
            .collect::<Result<Vec<_>>>()?;

        let response = self
            .client
            .register_task_definition()
            .family(&definition.family)
            .set_task_role_arn(definition.task_role_arn.clone())
            .set_execution_role_arn(definition.execution_role_arn.clone())
            .set_network_mode(definition.network_mode.as_deref().map(NetworkMode::from))
            .set_requires_compatibilities(non_empty(
                definition
                    .requires_compatibilities
                    .iter()
                    .map(|c| Compatibility::from(c.as_str()))
                    .collect(),
            ))
            .set_cpu(definition.cpu.clone())
            .set_memory(definition.memory.clone())
            .set_container_definitions(Some(containers))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to register task definition")?;

        let arn = response
            .task_definition()
            .and_then(|td| td.task_definition_arn())
            .context("No task definition ARN returned")?
            .to_string();

        info!(family = %definition.family, arn = %arn, "Task definition registered");
        Ok(arn)
    }

    pub async fn run_task(&self, config: &LaunchTaskConfig) -> Result<String> {
        let network = if config.subnets.is_empty() {
            None
        } else {
            let vpc = AwsVpcConfiguration::builder()
                .set_subnets(Some(config.subnets.clone()))
                .set_security_groups(non_empty(config.security_groups.clone()))
                .build()
                .context("Invalid awsvpc configuration")?;
            Some(NetworkConfiguration::builder().awsvpc_configuration(vpc).build())
        };

        info!(
            cluster = %config.cluster,
            task_definition = %config.task_definition_arn,
            launch_type = ?config.launch_type,
            subnets = config.subnets.len(),
            "Running task"
        );

        let response = self
            .client
            .run_task()
            .cluster(&config.cluster)
            .task_definition(&config.task_definition_arn)
            .set_launch_type(config.launch_type.as_deref().map(LaunchType::from))
            .set_network_configuration(network)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to run task")?;

        if let Some(task_arn) = response.tasks().first().and_then(|t| t.task_arn()) {
            info!(task_arn = %task_arn, "Task started");
            return Ok(task_arn.to_string());
        }

        let failures: Vec<String> = response
            .failures()
            .iter()
            .map(|f| {
                let reason = f.reason().unwrap_or("unknown reason");
                match f.detail() {
                    Some(detail) => format!("{reason} ({detail})"),
                    None => reason.to_string(),
                }
            })
            .collect();

        if failures.is_empty() {
            anyhow::bail!("ECS did not start a task and reported no failures");
        }
        anyhow::bail!("ECS could not start the task: {}", failures.join("; "))
    }

    pub async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<TaskDescription> {
        let response = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .tasks(task_arn)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))
            .context("Failed to describe task")?;

        let Some(task) = response.tasks().first() else {
            let reason = response
                .failures()
                .first()
                .and_then(|f| f.reason())
                .unwrap_or("no task returned");
            anyhow::bail!("Task {task_arn} not found: {reason}");
        };

        let description = task_description(task);
        debug!(task_arn = %task_arn, status = %description.status, "Described task");
        Ok(description)
    }
}

impl TaskOperations for EcsClient {
    async fn register(&self, definition: &TaskDefinitionDoc) -> Result<String> {
        EcsClient::register_task_definition(self, definition).await
    }

    async fn start(&self, config: &LaunchTaskConfig) -> Result<String> {
        EcsClient::run_task(self, config).await
    }

    async fn describe(&self, cluster: &str, task_arn: &str) -> Result<TaskDescription> {
        EcsClient::describe_task(self, cluster, task_arn).await
    }
}

fn container_definition(doc: &ContainerDefinitionDoc) -> Result<ContainerDefinition> {
    let secrets = doc
        .secrets
        .iter()
        .map(|s| {
            Secret::builder()
                .name(&s.name)
                .value_from(&s.value_from)
                .build()
                .with_context(|| format!("Invalid secret '{}' in container '{}'", s.name, doc.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let log_configuration = doc
        .log_configuration
        .as_ref()
        .map(|lc| {
            LogConfiguration::builder()
                .log_driver(LogDriver::from(lc.log_driver.as_str()))
                .set_options(Some(lc.options.clone().into_iter().collect()))
                .build()
                .with_context(|| format!("Invalid log configuration in container '{}'", doc.name))
        })
        .transpose()?;

    let environment = doc
        .environment
        .iter()
        .map(|kv| KeyValuePair::builder().name(&kv.name).value(&kv.value).build())
        .collect();

    let port_mappings = doc
        .port_mappings
        .iter()
        .map(|pm| {
            PortMapping::builder()
                .container_port(pm.container_port)
                .set_host_port(pm.host_port)
                .set_protocol(pm.protocol.as_deref().map(TransportProtocol::from))
                .build()
        })
        .collect();

    Ok(ContainerDefinition::builder()
        .name(&doc.name)
        .image(&doc.image)
        .set_cpu(doc.cpu)
        .set_memory(doc.memory)
        .set_memory_reservation(doc.memory_reservation)
        .set_essential(doc.essential)
        .set_command(non_empty(doc.command.clone()))
        .set_entry_point(non_empty(doc.entry_point.clone()))
        .set_working_directory(doc.working_directory.clone())
        .set_environment(non_empty(environment))
        .set_secrets(non_empty(secrets))
        .set_port_mappings(non_empty(port_mappings))
        .set_log_configuration(log_configuration)
        .build())
}

fn task_description(task: &Task) -> TaskDescription {
    let status = match task.last_status() {
        Some(s) => TaskStatus::parse(s).unwrap_or_else(|| {
            warn!(status = %s, "Unknown ECS task status, treating as pending");
            TaskStatus::Pending
        }),
        None => TaskStatus::Pending,
    };

    TaskDescription {
        status,
        task_definition_arn: task.task_definition_arn().map(str::to_string),
        started_at: task.started_at().and_then(to_chrono),
        stopped_at: task.stopped_at().and_then(to_chrono),
        stopped_reason: task.stopped_reason().map(str::to_string),
        stop_code: task.stop_code().map(|c| c.as_str().to_string()),
        containers: task.containers().iter().map(container_result).collect(),
    }
}

fn container_result(container: &Container) -> ContainerResult {
    ContainerResult {
        name: container.name().unwrap_or_default().to_string(),
        exit_code: container.exit_code(),
        reason: container.reason().map(str::to_string),
    }
}

fn to_chrono(ts: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
