use std::io;

use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use thiserror::Error;

/// Failure talking to the logging service.
///
/// Displays the whole cause chain of the SDK error, since the top-level
/// message alone is often just "unhandled error".
#[derive(Debug, Error)]
#[error("{}", DisplayErrorContext(.0))]
pub struct ApiError(aws_sdk_cloudwatchlogs::Error);

impl From<aws_sdk_cloudwatchlogs::Error> for ApiError {
    fn from(err: aws_sdk_cloudwatchlogs::Error) -> Self {
        ApiError(err)
    }
}

/// Failure building the CloudWatch client from the ambient AWS config.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no aws credentials provider configured")]
    NoCredentialsProvider,
    #[error("failed to load aws credentials")]
    Credentials(#[from] CredentialsError),
}

#[derive(Debug, Error)]
pub enum TailError {
    #[error("-g log groups flag is not set")]
    MissingGroups,
    #[error("log group cannot be empty")]
    EmptyGroup,
    #[error("failed to describe log group streams for group: {group}")]
    DescribeStreams {
        group: String,
        #[source]
        source: ApiError,
    },
    #[error("no log streams found for group: {0}")]
    NoStreams(String),
    #[error("failed to write log output")]
    Output(#[source] io::Error),
}
