//! Task definition document model
//!
//! The rendered template is the JSON body of a `RegisterTaskDefinition`
//! request, using the same camelCase field names as the ECS API and the
//! console's JSON editor. Fields this tool cannot pass on to ECS are
//! rejected when the document is parsed, so a registered revision never
//! differs from the template.

use crate::defaults::{AWSLOGS_GROUP, AWSLOGS_STREAM_PREFIX};
use crate::template::TemplateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A task definition as written in the template file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskDefinitionDoc {
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_compatibilities: Vec<String>,
    /// Task-level CPU units, as a string ("256", "1 vCPU")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Task-level memory, as a string ("512", "1 GB")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    pub container_definitions: Vec<ContainerDefinitionDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerDefinitionDoc {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_point: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValueDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_mappings: Vec<PortMappingDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<LogConfigurationDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyValueDoc {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretDoc {
    pub name: String,
    pub value_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PortMappingDoc {
    pub container_port: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogConfigurationDoc {
    pub log_driver: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Where a task's CloudWatch log streams live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocation {
    pub group: String,
    pub stream_prefix: String,
}

impl LogLocation {
    pub fn new(group: impl Into<String>, stream_prefix: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream_prefix: stream_prefix.into(),
        }
    }

    /// Stream name the awslogs driver uses: `{prefix}/{container}/{task_id}`.
    ///
    /// The container name is taken to be the app name, which is the
    /// convention the task definition templates follow.
    pub fn stream_name(&self, app_name: &str, task_id: &str) -> String {
        format!("{}/{}/{}", self.stream_prefix, app_name, task_id)
    }
}

impl TaskDefinitionDoc {
    /// Parse a rendered task definition document
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let doc: Self = serde_json::from_str(json).map_err(TemplateError::InvalidJson)?;
        if doc.container_definitions.is_empty() {
            return Err(TemplateError::NoContainers);
        }
        Ok(doc)
    }

    /// Log location from the first container's awslogs options.
    ///
    /// None when the first container has no log configuration or either the
    /// group or the stream prefix option is missing.
    pub fn log_location(&self) -> Option<LogLocation> {
        let options = &self
            .container_definitions
            .first()?
            .log_configuration
            .as_ref()?
            .options;

        Some(LogLocation::new(
            options.get(AWSLOGS_GROUP)?,
            options.get(AWSLOGS_STREAM_PREFIX)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "family": "worker",
        "networkMode": "awsvpc",
        "requiresCompatibilities": ["FARGATE"],
        "cpu": "256",
        "memory": "512",
        "containerDefinitions": [
            {
                "name": "worker",
                "image": "example/worker:latest",
                "essential": true,
                "command": ["./run", "--once"],
                "environment": [{"name": "MODE", "value": "batch"}],
                "portMappings": [{"containerPort": 8080, "protocol": "tcp"}],
                "logConfiguration": {
                    "logDriver": "awslogs",
                    "options": {
                        "awslogs-group": "/ecs/prod/worker",
                        "awslogs-region": "us-east-1",
                        "awslogs-stream-prefix": "ecs"
                    }
                }
            },
            {
                "name": "sidecar",
                "image": "example/sidecar:latest"
            }
        ]
    }"#;

    #[test]
    fn parses_document() {
        let doc = TaskDefinitionDoc::from_json(DOC).unwrap();
        assert_eq!(doc.family, "worker");
        assert_eq!(doc.network_mode.as_deref(), Some("awsvpc"));
        assert_eq!(doc.container_definitions.len(), 2);
        let first = &doc.container_definitions[0];
        assert_eq!(first.command, vec!["./run", "--once"]);
        assert_eq!(first.port_mappings[0].container_port, 8080);
        assert_eq!(first.environment[0].value, "batch");
    }

    #[test]
    fn log_location_from_first_container() {
        let doc = TaskDefinitionDoc::from_json(DOC).unwrap();
        let location = doc.log_location().unwrap();
        assert_eq!(location, LogLocation::new("/ecs/prod/worker", "ecs"));
        assert_eq!(location.stream_name("worker", "abc123"), "ecs/worker/abc123");
    }

    #[test]
    fn no_log_location_without_prefix() {
        let doc = TaskDefinitionDoc::from_json(
            r#"{"family": "f", "containerDefinitions": [{
                "name": "a", "image": "i",
                "logConfiguration": {"logDriver": "awslogs", "options": {"awslogs-group": "g"}}
            }]}"#,
        )
        .unwrap();
        assert!(doc.log_location().is_none());
    }

    #[test]
    fn no_log_location_without_configuration() {
        let doc = TaskDefinitionDoc::from_json(
            r#"{"family": "f", "containerDefinitions": [{"name": "a", "image": "i"}]}"#,
        )
        .unwrap();
        assert!(doc.log_location().is_none());
    }

    #[test]
    fn rejects_empty_container_list() {
        let err = TaskDefinitionDoc::from_json(r#"{"family": "f", "containerDefinitions": []}"#)
            .unwrap_err();
        assert!(matches!(err, TemplateError::NoContainers));
    }

    #[test]
    fn rejects_fields_that_cannot_be_registered() {
        let cases = [
            r#"{"family": "f", "runtimePlatform": {"cpuArchitecture": "ARM64"},
                "containerDefinitions": [{"name": "a", "image": "i"}]}"#,
            r#"{"family": "f", "volumes": [{"name": "data"}],
                "containerDefinitions": [{"name": "a", "image": "i"}]}"#,
            r#"{"family": "f", "containerDefinitions": [{"name": "a", "image": "i",
                "mountPoints": [{"sourceVolume": "data", "containerPath": "/data"}]}]}"#,
            r#"{"family": "f", "containerDefinitions": [{"name": "a", "image": "i",
                "healthCheck": {"command": ["CMD", "true"]}}]}"#,
            r#"{"family": "f", "containerDefinitions": [{"name": "a", "image": "i",
                "logConfiguration": {"logDriver": "awslogs",
                    "secretOptions": [{"name": "k", "valueFrom": "arn"}]}}]}"#,
        ];
        let fields = ["runtimePlatform", "volumes", "mountPoints", "healthCheck", "secretOptions"];

        for (json, field) in cases.iter().zip(fields) {
            match TaskDefinitionDoc::from_json(json) {
                Err(TemplateError::InvalidJson(e)) => {
                    assert!(e.to_string().contains(field), "{field}: {e}");
                }
                other => panic!("{field} was accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_invalid_json() {
        let err = TaskDefinitionDoc::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidJson(_)));
    }
}
