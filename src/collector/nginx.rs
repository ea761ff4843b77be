//! Prometheus collector for NGINX stub_status metrics.
//!
//! Structurally identical to the Nchan collector; only the report grammar
//! and the metric table differ.

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto;

use super::{const_metric_family, new_global_desc, ConstructionError, MetricKind};
use crate::client::Fetch;
use crate::status::nginx::{parse_stub_stats, NginxStats};

struct MetricSpec {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    value: fn(&NginxStats) -> i64,
}

#[rustfmt::skip]
const METRICS: [MetricSpec; 7] = [
    MetricSpec {
        name: "connections_active",
        help: "Active client connections",
        kind: MetricKind::Gauge,
        value: |s| s.connections.active,
    },
    MetricSpec {
        name: "connections_accepted",
        help: "Accepted client connections",
        kind: MetricKind::Counter,
        value: |s| s.connections.accepted,
    },
    MetricSpec {
        name: "connections_handled",
        help: "Handled client connections",
        kind: MetricKind::Counter,
        value: |s| s.connections.handled,
    },
    MetricSpec {
        name: "connections_reading",
        help: "Connections where NGINX is reading the request header",
        kind: MetricKind::Gauge,
        value: |s| s.connections.reading,
    },
    MetricSpec {
        name: "connections_writing",
        help: "Connections where NGINX is writing the response back to the client",
        kind: MetricKind::Gauge,
        value: |s| s.connections.writing,
    },
    MetricSpec {
        name: "connections_waiting",
        help: "Idle client connections",
        kind: MetricKind::Gauge,
        value: |s| s.connections.waiting,
    },
    MetricSpec {
        name: "http_requests_total",
        help: "Total http requests",
        kind: MetricKind::Counter,
        value: |s| s.requests,
    },
];

/// Collects NGINX metrics from a stub_status page.
#[derive(Debug)]
pub struct NginxCollector<F> {
    fetcher: F,
    descs: Vec<Desc>,
    lock: Mutex<()>,
}

impl<F: Fetch> NginxCollector<F> {
    /// Creates a collector, probing the scrape target once.
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

impl<F: Fetch> Collector for NginxCollector<F> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let _cycle = self.lock.lock();

        let raw = match self.fetcher.fetch() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "fetching nginx status report");
                return Vec::new();
            }
        };

        let stats = match parse_stub_stats(&raw) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "parsing nginx status report");
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
