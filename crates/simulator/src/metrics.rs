//! Join metrics derived from the event log.

use hdrhistogram::Histogram;
use ringsim_core::Notification;
use ringsim_messages::MessageKind;
use ringsim_simulation::{EventLog, LogRecord};
use ringsim_types::{NodeId, NodeState, SimTime};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Highest latency tracked, in ticks.
const MAX_TRACKED_TICKS: u64 = 1 << 32;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to create histogram: {0:?}")]
    Histogram(hdrhistogram::CreationError),
}

/// Latency and traffic figures for the joins of one run.
pub struct JoinMetrics {
    /// Ticks from a joiner's `Connect` to it becoming connected.
    join_latency: Histogram<u64>,

    /// Ticks between send and delivery.
    message_delay: Histogram<u64>,

    /// Joiners that never connected.
    incomplete: Vec<NodeId>,

    /// Accepted sends, by kind.
    sent_by_kind: BTreeMap<MessageKind, u64>,
}

impl JoinMetrics {
    /// Compute metrics from a run's event log.
    pub fn from_log(log: &EventLog) -> Result<Self, MetricsError> {
        let mut join_latency =
            Histogram::new_with_bounds(1, MAX_TRACKED_TICKS, 3).map_err(MetricsError::Histogram)?;
        let mut message_delay =
            Histogram::new_with_bounds(1, MAX_TRACKED_TICKS, 3).map_err(MetricsError::Histogram)?;
        let mut sent_by_kind = BTreeMap::new();
        let mut join_started: BTreeMap<NodeId, SimTime> = BTreeMap::new();

        for entry in log.entries() {
            match &entry.record {
                LogRecord::Sent {
                    message,
                    deliver_at,
                } => {
                    *sent_by_kind.entry(message.kind()).or_insert(0) += 1;
                    message_delay.saturating_record(deliver_at.since(entry.time));
                    if message.kind() == MessageKind::Connect {
                        join_started.insert(entry.node, entry.time);
                    }
                }
                LogRecord::Notified(Notification::StateChanged {
                    to: NodeState::Connected,
                    ..
                }) => {
                    if let Some(started) = join_started.remove(&entry.node) {
                        join_latency.saturating_record(entry.time.since(started));
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            join_latency,
            message_delay,
            incomplete: join_started.into_keys().collect(),
            sent_by_kind,
        })
    }

    /// Joins that completed.
    pub fn joins_completed(&self) -> u64 {
        self.join_latency.len()
    }

    /// Joiners still waiting when the log ends.
    pub fn incomplete_joins(&self) -> &[NodeId] {
        &self.incomplete
    }

    /// Join latency at the given quantile (0.0 - 1.0).
    pub fn join_latency_at(&self, quantile: f64) -> u64 {
        self.join_latency.value_at_quantile(quantile)
    }

    /// Slowest join.
    pub fn max_join_latency(&self) -> u64 {
        self.join_latency.max()
    }

    /// Mean send-to-delivery delay.
    pub fn mean_message_delay(&self) -> f64 {
        self.message_delay.mean()
    }

    /// Accepted sends of one kind.
    pub fn sent(&self, kind: MessageKind) -> u64 {
        self.sent_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// All accepted sends.
    pub fn total_sent(&self) -> u64 {
        self.sent_by_kind.values().sum()
    }
}

impl fmt::Display for JoinMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Joins: {} completed, {} incomplete",
            self.joins_completed(),
            self.incomplete.len()
        )?;
        if self.joins_completed() > 0 {
            writeln!(
                f,
                "Join latency (ticks): p50={} p90={} p99={} max={}",
                self.join_latency_at(0.5),
                self.join_latency_at(0.9),
                self.join_latency_at(0.99),
                self.max_join_latency()
            )?;
        }
        write!(
            f,
            "Messages: {} sent, mean delay {:.2} ticks",
            self.total_sent(),
            self.mean_message_delay()
        )?;
        for kind in MessageKind::ALL {
            write!(f, "\n  {:<16}{}", kind.type_name(), self.sent(kind))?;
        }
        Ok(())
    }
}
