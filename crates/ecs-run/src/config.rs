//! Configuration from the process environment
//!
//! Every input can be given as a flag or through the environment variable
//! the deploy pipelines already set. Required values are validated here,
//! before any AWS client exists.

use crate::aws::LaunchTaskConfig;
use ecs_run_common::LogLocation;
use ecs_run_common::defaults::{DEFAULT_POLL_JITTER, DEFAULT_TEMPLATE_FILE};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),
}

/// Inputs shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// ECS cluster to run the task on
    #[arg(long, env = "CLUSTER_NAME", global = true)]
    pub cluster_name: Option<String>,

    /// Service/app name, used in the log stream name
    #[arg(long, env = "APP_NAME", global = true)]
    pub app_name: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_DEFAULT_REGION", global = true)]
    pub region: Option<String>,

    /// Launch type (FARGATE, EC2, EXTERNAL)
    #[arg(long, env = "SERVICE_TYPE")]
    pub service_type: Option<String>,

    /// Comma-separated awsvpc subnet IDs
    #[arg(long, env = "SUBNETS", value_delimiter = ',')]
    pub subnets: Vec<String>,

    /// Comma-separated security group IDs
    #[arg(long, env = "SECURITY_GROUPS", value_delimiter = ',')]
    pub security_groups: Vec<String>,

    /// Task definition template file
    #[arg(long, env = "TPL_FILE_NAME", default_value = DEFAULT_TEMPLATE_FILE)]
    pub template_file: PathBuf,

    /// Also write the final report as JSON to this file
    #[arg(long, env = "REPORT_FILE", global = true)]
    pub report_file: Option<PathBuf>,
}

/// Polling cadence
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Sleeps are drawn uniformly from `[0, jitter]`
    pub jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            jitter: DEFAULT_POLL_JITTER,
        }
    }
}

/// Validated identity of the task being observed
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub cluster: String,
    pub app_name: String,
    pub region: String,
    pub report_file: Option<PathBuf>,
    pub poll: PollConfig,
}

/// Configuration for registering and running a task
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: TargetConfig,
    pub launch_type: Option<String>,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub template_file: PathBuf,
}

/// Configuration for attaching to an already running task
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub target: TargetConfig,
    pub task_arn: String,
    pub log_location: LogLocation,
}

impl TargetConfig {
    pub fn from_args(args: &EnvArgs) -> Result<Self, ConfigError> {
        let cluster = present(&args.cluster_name);
        let app_name = present(&args.app_name);
        let region = present(&args.region);

        match (cluster, app_name, region) {
            (Some(cluster), Some(app_name), Some(region)) => Ok(Self {
                cluster: cluster.to_string(),
                app_name: app_name.to_string(),
                region: region.to_string(),
                report_file: args.report_file.clone(),
                poll: PollConfig::default(),
            }),
            (cluster, app_name, region) => {
                let missing = [
                    ("CLUSTER_NAME", cluster.is_none()),
                    ("APP_NAME", app_name.is_none()),
                    ("AWS_DEFAULT_REGION", region.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(ConfigError::MissingVariables(missing))
            }
        }
    }
}

impl RunConfig {
    pub fn from_args(args: &EnvArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            target: TargetConfig::from_args(args)?,
            launch_type: present(&args.service_type).map(str::to_string),
            subnets: clean_list(&args.subnets),
            security_groups: clean_list(&args.security_groups),
            template_file: args.template_file.clone(),
        })
    }

    /// Launch parameters for a registered task definition
    pub fn launch_config(&self, task_definition_arn: &str) -> LaunchTaskConfig {
        LaunchTaskConfig {
            cluster: self.target.cluster.clone(),
            task_definition_arn: task_definition_arn.to_string(),
            launch_type: self.launch_type.clone(),
            subnets: self.subnets.clone(),
            security_groups: self.security_groups.clone(),
        }
    }
}

impl TailConfig {
    /// Logs default to group `/ecs/{cluster}/{app}` and stream prefix `{app}`
    pub fn from_args(
        args: &EnvArgs,
        task_arn: String,
        log_group: Option<String>,
        stream_prefix: Option<String>,
    ) -> Result<Self, ConfigError> {
        let target = TargetConfig::from_args(args)?;
        let log_location = LogLocation::new(
            log_group.unwrap_or_else(|| format!("/ecs/{}/{}", target.cluster, target.app_name)),
            stream_prefix.unwrap_or_else(|| target.app_name.clone()),
        );
        Ok(Self {
            target,
            task_arn,
            log_location,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_args() -> EnvArgs {
        EnvArgs {
            cluster_name: Some("prod".to_string()),
            app_name: Some("worker".to_string()),
            region: Some("us-east-1".to_string()),
            service_type: Some("FARGATE".to_string()),
            subnets: vec!["subnet-a".to_string(), " subnet-b ".to_string(), String::new()],
            security_groups: vec!["sg-1".to_string()],
            template_file: PathBuf::from(DEFAULT_TEMPLATE_FILE),
            report_file: None,
        }
    }

    #[test]
    fn valid_run_config() {
        let config = RunConfig::from_args(&full_args()).unwrap();
        assert_eq!(config.target.cluster, "prod");
        assert_eq!(config.target.region, "us-east-1");
        assert_eq!(config.launch_type.as_deref(), Some("FARGATE"));
        assert_eq!(config.subnets, vec!["subnet-a", "subnet-b"]);
        assert_eq!(config.target.poll.jitter, Duration::from_secs(6));

        let launch = config.launch_config("arn:td");
        assert_eq!(launch.cluster, "prod");
        assert_eq!(launch.task_definition_arn, "arn:td");
        assert_eq!(launch.security_groups, vec!["sg-1"]);
    }

    #[test]
    fn missing_variables_are_all_reported() {
        let args = EnvArgs {
            app_name: Some("worker".to_string()),
            ..Default::default()
        };
        let err = RunConfig::from_args(&args).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingVariables(vec!["CLUSTER_NAME", "AWS_DEFAULT_REGION"])
        );
        assert_eq!(
            err.to_string(),
            "missing required environment variables: CLUSTER_NAME, AWS_DEFAULT_REGION"
        );
    }

    #[test]
    fn each_required_variable_is_checked() {
        for name in ["CLUSTER_NAME", "APP_NAME", "AWS_DEFAULT_REGION"] {
            let mut args = full_args();
            match name {
                "CLUSTER_NAME" => args.cluster_name = None,
                "APP_NAME" => args.app_name = None,
                _ => args.region = None,
            }
            assert_eq!(
                RunConfig::from_args(&args).unwrap_err(),
                ConfigError::MissingVariables(vec![name])
            );
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut args = full_args();
        args.cluster_name = Some("   ".to_string());
        assert_eq!(
            RunConfig::from_args(&args).unwrap_err(),
            ConfigError::MissingVariables(vec!["CLUSTER_NAME"])
        );
    }

    #[test]
    fn blank_launch_type_is_none() {
        let mut args = full_args();
        args.service_type = Some(String::new());
        assert!(RunConfig::from_args(&args).unwrap().launch_type.is_none());
    }

    #[test]
    fn tail_defaults_log_location() {
        let config = TailConfig::from_args(&full_args(), "arn:task".to_string(), None, None).unwrap();
        assert_eq!(config.log_location, LogLocation::new("/ecs/prod/worker", "worker"));
        assert_eq!(
            config.log_location.stream_name("worker", "abc"),
            "worker/worker/abc"
        );
    }

    #[test]
    fn tail_overrides_log_location() {
        let config = TailConfig::from_args(
            &full_args(),
            "arn:task".to_string(),
            Some("/custom".to_string()),
            Some("ecs".to_string()),
        )
        .unwrap();
        assert_eq!(config.log_location, LogLocation::new("/custom", "ecs"));
    }
}
