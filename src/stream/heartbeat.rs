//! Keep-alive supervision of long-running steps

use super::events::{EventSink, StreamEvent};
use crate::config::ServerConfig;
use crate::error::IdeationError;
use crate::metrics::METRICS;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Whether and how often supervised steps emit heartbeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatPolicy {
    Enabled { interval: Duration, poll: Duration },
    Disabled,
}

impl HeartbeatPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        if config.heartbeat_interval_secs == 0 {
            return Self::Disabled;
        }
        Self::Enabled {
            interval: config.heartbeat_interval(),
            poll: config.heartbeat_poll().max(Duration::from_millis(10)),
        }
    }
}

/// Drive `work` to completion, emitting a heartbeat every `interval` while
/// it is pending.
///
/// Heartbeats never wait on the sink, so a slow client cannot stall the
/// work; a heartbeat that finds the buffer full is skipped. Only a closed
/// sink is an error; the work's own output is returned untouched.
pub async fn supervise<F, T>(
    work: F,
    policy: HeartbeatPolicy,
    sink: &EventSink,
) -> Result<T, IdeationError>
where
    F: Future<Output = T>,
{
    let (interval, poll) = match policy {
        HeartbeatPolicy::Disabled => return Ok(work.await),
        HeartbeatPolicy::Enabled { interval, poll } => (interval, poll),
    };

    tokio::pin!(work);
    let started = Instant::now();
    let mut last_beat = started;

    loop {
        tokio::select! {
            biased;
            output = &mut work => return Ok(output),
            _ = sleep(poll) => {
                if last_beat.elapsed() >= interval {
                    last_beat = Instant::now();
                    let elapsed_secs = started.elapsed().as_secs();
                    if sink.try_emit(StreamEvent::Heartbeat { elapsed_secs })? {
                        debug!("Heartbeat after {}s", elapsed_secs);
                        METRICS.record_heartbeat();
                    } else {
                        debug!("Event buffer full, skipping heartbeat at {}s", elapsed_secs);
                    }
                }
            }
        }
    }
}
