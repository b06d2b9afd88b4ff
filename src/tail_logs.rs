//! Stream resolution and the per-group polling loops.
//!
//! Startup is sequential and fail-fast: every group must resolve to a stream
//! before any poller starts. After that one poller per group runs until the
//! process is killed, woken by a single shared ticker.
//!
//! Known limitations kept on purpose:
//! - each fetch asks for the service's default window, so records can repeat
//!   or be missed between ticks;
//! - a group's stream is resolved once and never refreshed.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::args::parse_groups;
use crate::client::LogsApi;
use crate::error::TailError;

pub const REFRESH_RATE: Duration = Duration::from_secs(3);
// A poller that misses ticks only needs to know it should fetch again.
const TICK_BUFFER: usize = 1;

/// Group name to the stream picked for it at startup.
pub type StreamMap = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamTarget {
    pub group: String,
    pub stream: String,
}

/// Destination for poller output, one line per call.
pub trait LineSink: Send + Sync {
    fn line(&self, line: &str) -> io::Result<()>;
}

/// Writes straight to stdout. Lines from different pollers are not ordered
/// relative to each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn line(&self, line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{line}")
    }
}

/// Returns the most recently active stream of `group`.
pub async fn resolve_stream(api: &dyn LogsApi, group: &str) -> Result<String, TailError> {
    let streams = api
        .describe_streams(group, 1)
        .await
        .map_err(|source| TailError::DescribeStreams {
            group: group.to_string(),
            source,
        })?;

    let latest = streams
        .into_iter()
        .next()
        .ok_or_else(|| TailError::NoStreams(group.to_string()))?;
    debug!(group, stream = %latest.name, last_event = ?latest.last_event_timestamp, "latest stream");
    Ok(latest.name)
}

/// Resolves every group in order, stopping at the first failure.
pub async fn resolve_streams(api: &dyn LogsApi, groups: &[String]) -> Result<StreamMap, TailError> {
    let mut streams = StreamMap::new();
    for group in groups {
        let stream = resolve_stream(api, group).await?;
        info!(group = %group, stream = %stream, "resolved latest log stream");
        streams.insert(group.clone(), stream);
    }
    Ok(streams)
}

/// One tick's worth of work: fetch the stream and print what came back.
///
/// Fetch failures are printed, not returned. The only error is the sink
/// refusing output.
pub async fn fetch_and_print(api: &dyn LogsApi, target: &StreamTarget, sink: &dyn LineSink) -> io::Result<()> {
    sink.line(&format!(
        "fetching logs for stream: {} in group: {}",
        target.stream, target.group
    ))?;

    match api.log_events(&target.group, &target.stream).await {
        Ok(records) => {
            for record in &records {
                sink.line(record)?;
            }
        }
        Err(err) => {
            warn!(group = %target.group, stream = %target.stream, error = %err, "fetch failed");
            sink.line(&format!(
                "failed to fetch logs for stream {}, err: {}",
                target.stream, err
            ))?;
        }
    }
    Ok(())
}

/// Fetches `target` on every tick. Fetch errors never stop the loop; it ends
/// when the tick source goes away or the sink stops accepting output.
pub async fn poll_stream(
    api: Arc<dyn LogsApi>,
    target: StreamTarget,
    mut ticks: broadcast::Receiver<()>,
    sink: Arc<dyn LineSink>,
) -> io::Result<()> {
    loop {
        match ticks.recv().await {
            Ok(()) => fetch_and_print(api.as_ref(), &target, sink.as_ref()).await?,
            Err(RecvError::Lagged(missed)) => {
                debug!(stream = %target.stream, missed, "poller fell behind the ticker");
            }
            Err(RecvError::Closed) => {
                debug!(stream = %target.stream, "tick source closed, poller exiting");
                return Ok(());
            }
        }
    }
}

pub fn spawn_pollers(
    api: &Arc<dyn LogsApi>,
    streams: &StreamMap,
    ticker: &broadcast::Sender<()>,
    sink: &Arc<dyn LineSink>,
) -> JoinSet<io::Result<()>> {
    let mut pollers = JoinSet::new();
    for (group, stream) in streams {
        let target = StreamTarget {
            group: group.clone(),
            stream: stream.clone(),
        };
        pollers.spawn(poll_stream(
            Arc::clone(api),
            target,
            ticker.subscribe(),
            Arc::clone(sink),
        ));
    }
    pollers
}

/// Fires `ticker` every `period`, starting one period from now.
pub fn start_ticker(ticker: broadcast::Sender<()>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if ticker.send(()).is_err() {
                debug!("tick sent with no pollers subscribed");
            }
        }
    })
}

/// Resolves all groups, then tails them until the process is killed.
///
/// The only way out once tailing is output going away (a closed pipe), which
/// comes back as [`TailError::Output`]. A panicking poller takes the process down.
pub async fn run(
    api: Arc<dyn LogsApi>,
    groups: Option<&str>,
    sink: Arc<dyn LineSink>,
) -> Result<Infallible, TailError> {
    let groups = parse_groups(groups)?;
    let streams = resolve_streams(api.as_ref(), &groups).await?;

    let (ticker, _) = broadcast::channel(TICK_BUFFER);
    let mut pollers = spawn_pollers(&api, &streams, &ticker, &sink);
    let _ticker = start_ticker(ticker, REFRESH_RATE);
    info!(pollers = pollers.len(), every = ?REFRESH_RATE, "tailing log streams");

    while let Some(joined) = pollers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(TailError::Output(err)),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => warn!(error = %err, "poller task cancelled"),
        }
    }
    Ok(std::future::pending().await)
}
