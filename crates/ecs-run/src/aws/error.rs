//! AWS error classification
//!
//! SDK errors are classified by their error code (via
//! `ProvideErrorMetadata`) rather than by matching on Debug output.

use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// AWS error categories
#[derive(Debug, Error)]
pub enum AwsError {
    /// Referenced resource does not exist (yet)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// ECS cluster does not exist in this account/region
    #[error("Cluster not found: {message}")]
    ClusterNotFound { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Credentials missing, expired or lacking permission
    #[error("Access denied: {message}")]
    AccessDenied { code: String, message: String },

    /// Request rejected as malformed
    #[error("Invalid request: {message}")]
    InvalidRequest { code: String, message: String },

    /// Any other AWS SDK error
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

/// Failures reading a log stream
#[derive(Debug, Error)]
pub enum LogFetchError {
    /// The stream has not been created yet; expected until the container
    /// writes its first line
    #[error("log stream {group}/{stream} does not exist")]
    StreamNotFound { group: String, stream: String },

    #[error("failed to read log stream {group}/{stream}")]
    Service {
        group: String,
        stream: String,
        #[source]
        source: AwsError,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { .. } => Some("ResourceNotFoundException"),
            AwsError::ClusterNotFound { .. } => Some("ClusterNotFoundException"),
            AwsError::Throttled => Some("ThrottlingException"),
            AwsError::AccessDenied { code, .. } | AwsError::InvalidRequest { code, .. } => {
                Some(code)
            }
            AwsError::Sdk { code, .. } => code.as_deref(),
        }
    }

    /// User-friendly hint for resolving this error, if one is known
    pub fn suggestion(&self) -> Option<&'static str> {
        self.code().and_then(suggestion_for_code)
    }
}

const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException"];

const CLUSTER_NOT_FOUND_CODES: &[&str] = &["ClusterNotFoundException"];

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDeniedException",
    "AccessDenied",
    "UnrecognizedClientException",
    "ExpiredTokenException",
    "InvalidClientTokenId",
];

const INVALID_REQUEST_CODES: &[&str] = &[
    "ClientException",
    "InvalidParameterException",
    "PlatformUnknownException",
    "PlatformTaskDefinitionIncompatibilityException",
];

/// Classify an AWS error from its code and message
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if CLUSTER_NOT_FOUND_CODES.contains(&c) => AwsError::ClusterNotFound { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied {
            code: c.to_string(),
            message,
        },
        Some(c) if INVALID_REQUEST_CODES.contains(&c) => AwsError::InvalidRequest {
            code: c.to_string(),
            message,
        },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an SDK error.
///
/// Errors without service metadata (timeouts, DNS or connection failures)
/// fall back to the full error context as the message.
pub fn classify_sdk_error<E>(err: &E) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let context;
    let message = match err.message() {
        Some(m) => m,
        None => {
            context = DisplayErrorContext(err).to_string();
            context.as_str()
        }
    };
    classify_aws_error(err.code(), Some(message))
}

/// Find a classified AWS error anywhere in an error's source chain
pub fn find_aws_error<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a AwsError> {
    std::iter::successors(Some(error), |e| e.source())
        .find_map(|cause| cause.downcast_ref::<AwsError>())
}

const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "ClusterNotFoundException",
        "Check CLUSTER_NAME and AWS_DEFAULT_REGION point at an existing ECS cluster.",
    ),
    (
        "AccessDeniedException",
        "The current credentials lack the required ECS or CloudWatch Logs permissions.",
    ),
    (
        "UnrecognizedClientException",
        "The AWS credentials are invalid; check AWS_ACCESS_KEY_ID / AWS_PROFILE.",
    ),
    (
        "ExpiredTokenException",
        "The AWS session token has expired; refresh your credentials.",
    ),
    (
        "PlatformUnknownException",
        "The requested platform version does not exist for this launch type.",
    ),
    (
        "PlatformTaskDefinitionIncompatibilityException",
        "The task definition is not compatible with the requested launch type.",
    ),
    (
        "ThrottlingException",
        "AWS API rate limit hit. Try again in a moment.",
    ),
];

fn suggestion_for_code(code: &str) -> Option<&'static str> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
}
