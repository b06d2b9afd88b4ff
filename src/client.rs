//! Access to the logging service.
//!
//! The tailing logic only sees [`LogsApi`]. [`CloudWatchLogs`] is the real
//! implementation; tests use the in-memory `fake::FakeLogs`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_cloudwatchlogs::Client as logs_client;
use aws_sdk_cloudwatchlogs::types::OrderBy as logs_OrderBy;
use tracing::{debug, info};

use crate::error::{ApiError, BootstrapError};

#[cfg(test)]
pub mod fake;

/// A log stream as reported by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSummary {
    pub name: String,
    pub last_event_timestamp: Option<i64>,
}

#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Streams of `group`, most recently active first, at most `limit` of them.
    async fn describe_streams(&self, group: &str, limit: i32) -> Result<Vec<StreamSummary>, ApiError>;

    /// Message text of the events the service returns for one stream.
    ///
    /// No time range, token or limit is sent, so the window is whatever the
    /// service picks by default.
    async fn log_events(&self, group: &str, stream: &str) -> Result<Vec<String>, ApiError>;
}

#[derive(Debug)]
pub struct CloudWatchLogs {
    logs: logs_client,
}

impl CloudWatchLogs {
    /// Loads the default AWS config chain and checks that it resolves credentials.
    pub async fn connect() -> Result<Self, BootstrapError> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let provider = config
            .credentials_provider()
            .ok_or(BootstrapError::NoCredentialsProvider)?;
        provider.provide_credentials().await?;
        info!(region = ?config.region(), "aws credentials resolved");

        Ok(logs_client::new(&config).into())
    }
}

impl From<logs_client> for CloudWatchLogs {
    fn from(logs: logs_client) -> Self {
        CloudWatchLogs { logs }
    }
}

#[async_trait]
impl LogsApi for CloudWatchLogs {
    async fn describe_streams(&self, group: &str, limit: i32) -> Result<Vec<StreamSummary>, ApiError> {
        let r = self
            .logs
            .describe_log_streams()
            .log_group_name(group)
            .order_by(logs_OrderBy::LastEventTime)
            .descending(true)
            .limit(limit)
            .send()
            .await
            .map_err(aws_sdk_cloudwatchlogs::Error::from)?;

        let streams = r
            .log_streams()
            .iter()
            .filter_map(|stream| {
                stream.log_stream_name().map(|name| StreamSummary {
                    name: name.to_string(),
                    last_event_timestamp: stream.last_event_timestamp(),
                })
            })
            .collect();
        Ok(streams)
    }

    async fn log_events(&self, group: &str, stream: &str) -> Result<Vec<String>, ApiError> {
        let r = self
            .logs
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
            .map_err(aws_sdk_cloudwatchlogs::Error::from)?;

        let events = r.events();
        debug!(group, stream, count = events.len(), "log events received");
        Ok(events
            .iter()
            .map(|event| event.message().unwrap_or_default().to_string())
            .collect())
    }
}
