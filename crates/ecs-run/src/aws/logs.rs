//! CloudWatch Logs retrieval for task output

use super::AwsContext;
use super::error::{LogFetchError, classify_sdk_error};
use aws_sdk_cloudwatchlogs::Client;
use tracing::debug;

/// One log event as printed to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Event time in milliseconds since the epoch
    pub timestamp: Option<i64>,
    pub message: String,
}

impl LogRecord {
    pub fn new(timestamp: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

/// One page of `GetLogEvents`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    pub records: Vec<LogRecord>,
    /// Forward token; equal to the token sent when there was nothing new
    pub next_token: Option<String>,
}

/// Paginated log retrieval, abstracted for testing
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait LogOperations: Send + Sync {
    /// Fetch the page after `token`, or the first page of the stream when
    /// `token` is None and `from_head` is set.
    async fn fetch(
        &self,
        group: &str,
        stream: &str,
        token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogFetchError>;
}

/// CloudWatch Logs client for reading task output
pub struct LogsClient {
    client: Client,
}

impl LogsClient {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.logs_client(),
        }
    }

    pub async fn get_log_events(
        &self,
        group: &str,
        stream: &str,
        token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogFetchError> {
        let response = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_next_token(token.map(str::to_string))
            .start_from_head(start_from_head(token, from_head))
            .send()
            .await
            .map_err(|e| {
                let classified = classify_sdk_error(&e);
                if classified.is_not_found() {
                    LogFetchError::StreamNotFound {
                        group: group.to_string(),
                        stream: stream.to_string(),
                    }
                } else {
                    LogFetchError::Service {
                        group: group.to_string(),
                        stream: stream.to_string(),
                        source: classified,
                    }
                }
            })?;

        let records: Vec<LogRecord> = response
            .events()
            .iter()
            .filter_map(|e| e.message().map(|m| LogRecord::new(e.timestamp(), m)))
            .collect();

        debug!(
            group = %group,
            stream = %stream,
            records = records.len(),
            "Fetched log events"
        );

        Ok(LogPage {
            records,
            next_token: response.next_forward_token().map(str::to_string),
        })
    }
}

/// `GetLogEvents` requires `startFromHead` whenever a forward token is sent
fn start_from_head(token: Option<&str>, from_head: bool) -> bool {
    from_head || token.is_some()
}

impl LogOperations for LogsClient {
    async fn fetch(
        &self,
        group: &str,
        stream: &str,
        token: Option<&str>,
        from_head: bool,
    ) -> Result<LogPage, LogFetchError> {
        LogsClient::get_log_events(self, group, stream, token, from_head).await
    }
}
