//! In-memory [`LogsApi`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Error as CloudWatchError;
use aws_sdk_cloudwatchlogs::operation::get_log_events::GetLogEventsError;
use aws_sdk_cloudwatchlogs::types::error::{ResourceNotFoundException, ServiceUnavailableException};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::{ConnectorError, SdkError};

use crate::client::{LogsApi, StreamSummary};
use crate::error::ApiError;

/// Scripted fetch result for one tick.
pub type FakeFetch = Result<Vec<String>, CloudWatchError>;

pub fn not_found(message: &str) -> CloudWatchError {
    CloudWatchError::ResourceNotFoundException(ResourceNotFoundException::builder().message(message).build())
}

pub fn unavailable(message: &str) -> CloudWatchError {
    CloudWatchError::ServiceUnavailableException(ServiceUnavailableException::builder().message(message).build())
}

/// An error as the SDK reports it when the request never reached the service.
pub fn dispatch_failure(cause: &str) -> CloudWatchError {
    let sdk: SdkError<GetLogEventsError, HttpResponse> =
        SdkError::dispatch_failure(ConnectorError::io(cause.to_string().into()));
    CloudWatchError::from(sdk)
}

#[derive(Debug, Default)]
pub struct FakeLogs {
    groups: HashMap<String, Vec<StreamSummary>>,
    describe_errors: Mutex<HashMap<String, CloudWatchError>>,
    fetches: Mutex<HashMap<String, VecDeque<FakeFetch>>>,
    fetch_calls: AtomicUsize,
}

impl FakeLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a group with `(stream, last_event_timestamp)` pairs, in any order.
    pub fn with_group(mut self, group: &str, streams: &[(&str, i64)]) -> Self {
        let streams = streams
            .iter()
            .map(|(name, ts)| StreamSummary {
                name: name.to_string(),
                last_event_timestamp: Some(*ts),
            })
            .collect();
        self.groups.insert(group.to_string(), streams);
        self
    }

    /// The next describe call for `group` fails with `err`.
    pub fn with_describe_error(self, group: &str, err: CloudWatchError) -> Self {
        self.describe_errors.lock().unwrap().insert(group.to_string(), err);
        self
    }

    /// Queue the result of the next fetch for `stream`. Unscripted fetches return no events.
    pub fn with_fetch(self, stream: &str, result: FakeFetch) -> Self {
        self.fetches
            .lock()
            .unwrap()
            .entry(stream.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogsApi for FakeLogs {
    async fn describe_streams(&self, group: &str, limit: i32) -> Result<Vec<StreamSummary>, ApiError> {
        if let Some(err) = self.describe_errors.lock().unwrap().remove(group) {
            return Err(err.into());
        }
        let mut streams = self
            .groups
            .get(group)
            .cloned()
            .ok_or_else(|| not_found("The specified log group does not exist."))?;
        streams.sort_by(|a, b| b.last_event_timestamp.cmp(&a.last_event_timestamp));
        streams.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(streams)
    }

    async fn log_events(&self, _group: &str, stream: &str) -> Result<Vec<String>, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .fetches
            .lock()
            .unwrap()
            .get_mut(stream)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(lines)) => Ok(lines),
            Some(Err(err)) => Err(err.into()),
            None => Ok(Vec::new()),
        }
    }
}
