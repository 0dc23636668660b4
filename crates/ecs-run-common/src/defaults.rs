//! Default configuration values

use std::time::Duration;

/// Task definition template read when `TPL_FILE_NAME` is not set
pub const DEFAULT_TEMPLATE_FILE: &str = "task-definition.tpl.json";

/// Upper bound of the jittered sleep between poll cycles
pub const DEFAULT_POLL_JITTER: Duration = Duration::from_secs(6);

/// Maximum number of `GetLogEvents` pages drained in a single poll
pub const MAX_LOG_PAGES_PER_POLL: usize = 100;

/// Option key holding the CloudWatch log group in an awslogs configuration
pub const AWSLOGS_GROUP: &str = "awslogs-group";

/// Option key holding the stream prefix in an awslogs configuration
pub const AWSLOGS_STREAM_PREFIX: &str = "awslogs-stream-prefix";

/// Notice printed (once) when no log output can be read
pub const NO_LOGS_NOTICE: &str = "No logs sent to CloudWatch";
