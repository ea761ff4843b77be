//! Prometheus collector for Nchan stub_status metrics.

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto;

use super::{const_metric_family, new_global_desc, ConstructionError, MetricKind};
use crate::client::Fetch;
use crate::status::nchan::{parse_stub_stats, StubStats};

/// One emittable metric: its name within the namespace, help text, kind, and
/// the stats field it reports.
struct MetricSpec {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    value: fn(&StubStats) -> i64,
}

#[rustfmt::skip]
const METRICS: [MetricSpec; 13] = [
    MetricSpec {
        name: "messages_published_total",
        help: "Number of messages published to all channels through this Nchan server",
        kind: MetricKind::Counter,
        value: |s| s.messages.total_published,
    },
    MetricSpec {
        name: "messages_stored",
        help: "Number of messages currently buffered in memory",
        kind: MetricKind::Counter,
        value: |s| s.messages.stored,
    },
    MetricSpec {
        name: "shared_memory_used",
        help: "Total shared memory used for buffering messages, storing channel information, and other purposes",
        kind: MetricKind::Gauge,
        value: |s| s.shared_memory_used,
    },
    MetricSpec {
        name: "shared_memory_limit",
        help: "Total shared memory used for buffering messages, storing channel information, and other purposes",
        kind: MetricKind::Gauge,
        value: |s| s.shared_memory_limit,
    },
    MetricSpec {
        name: "channels",
        help: "Number of channels present on this Nchan server",
        kind: MetricKind::Gauge,
        value: |s| s.channels,
    },
    MetricSpec {
        name: "subscribers",
        help: "Number of subscribers to all channels on this Nchan server",
        kind: MetricKind::Gauge,
        value: |s| s.subscribers,
    },
    MetricSpec {
        name: "redis_pending_commands",
        help: "Number of commands sent to Redis that are awaiting a reply",
        kind: MetricKind::Gauge,
        value: |s| s.redis.pending_commands,
    },
    MetricSpec {
        name: "redis_connected_servers",
        help: "Number of redis servers to which Nchan is currently connected",
        kind: MetricKind::Gauge,
        value: |s| s.redis.connected_servers,
    },
    MetricSpec {
        name: "interprocess_alerts_received_total",
        help: "Number of interprocess communication packets transmitted between Nginx workers processes for Nchan",
        kind: MetricKind::Counter,
        value: |s| s.interprocess.total_alerts_received,
    },
    MetricSpec {
        name: "interprocess_alerts_in_transit",
        help: "Number of interprocess communication packets in transit between Nginx workers",
        kind: MetricKind::Gauge,
        value: |s| s.interprocess.alerts_in_transit,
    },
    MetricSpec {
        name: "interprocess_queued_alerts",
        help: "Number of interprocess communication packets waiting to be sent",
        kind: MetricKind::Gauge,
        value: |s| s.interprocess.queued_alerts,
    },
    MetricSpec {
        name: "interprocess_send_delay_total",
        help: "Total amount of time interprocess communication packets spend being queued if delayed",
        kind: MetricKind::Counter,
        value: |s| s.interprocess.total_send_delay,
    },
    MetricSpec {
        name: "interprocess_receive_delay_total",
        help: "Total amount of time interprocess communication packets spend in transit if delayed",
        kind: MetricKind::Counter,
        value: |s| s.interprocess.total_receive_delay,
    },
];

/// Collects Nchan metrics from a stub_status page.
///
/// Collection cycles are mutually exclusive per instance: the lock is held
/// across the whole fetch+parse+emit sequence, so overlapping scrapes are
/// serialized against the remote server. A failed cycle logs the error and
/// emits nothing; it never poisons later cycles.
#[derive(Debug)]
pub struct NchanCollector<F> {
    fetcher: F,
    descs: Vec<Desc>,
    lock: Mutex<()>,
}

impl<F: Fetch> NchanCollector<F> {
    /// Creates a collector, probing the scrape target once.
    ///
    /// The probe runs a full fetch+parse cycle so that a misconfigured or
    /// unreachable target fails startup instead of the first scrape.
    pub fn new(fetcher: F, namespace: &str) -> Result<Self, ConstructionError> {
        let raw = fetcher.fetch()?;
        parse_stub_stats(&raw)?;

        let descs = METRICS
            .iter()
            .map(|m| new_global_desc(namespace, m.name, m.help))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            fetcher,
            descs,
            lock: Mutex::new(()),
        })
    }
}

impl<F: Fetch> Collector for NchanCollector<F> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let _cycle = self.lock.lock();

        let raw = match self.fetcher.fetch() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "fetching nchan status report");
                return Vec::new();
            }
        };

        let stats = match parse_stub_stats(&raw) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "parsing nchan status report");
                return Vec::new();
            }
        };

        METRICS
            .iter()
            .zip(&self.descs)
            .map(|(m, desc)| const_metric_family(desc, m.kind, (m.value)(&stats) as f64))
            .collect()
    }
}
