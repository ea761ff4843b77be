//! Custom Prometheus collectors over the status report parsers.
//!
//! Each collector owns a static descriptor table built at construction and a
//! single critical section serializing its fetch+parse+emit cycles. Samples
//! are emitted as const metric families; nothing is accumulated between
//! cycles.

pub mod nchan;
pub mod nginx;

pub use nchan::NchanCollector;
pub use nginx::NginxCollector;

use std::collections::HashMap;

use prometheus::core::Desc;
use prometheus::proto;
use thiserror::Error;

use crate::client::FetchError;
use crate::status::ParseError;

/// Errors raised while constructing a collector.
///
/// Construction performs one eager fetch+parse probe against the scrape
/// target; a failure here is fatal to process startup rather than surfacing
/// on the first scrape.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("initial scrape failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("initial status report is malformed: {0}")]
    Parse(#[from] ParseError),

    #[error("building metric descriptors: {0}")]
    Desc(#[from] prometheus::Error),
}

/// Whether a metric's value is cumulative or instantaneous.
///
/// Fixed per metric name at construction time; the collectors forward the
/// remote value under this classification without enforcing monotonicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    fn proto_type(self) -> proto::MetricType {
        match self {
            Self::Counter => proto::MetricType::COUNTER,
            Self::Gauge => proto::MetricType::GAUGE,
        }
    }
}

/// Builds the descriptor for an unlabeled, namespaced global metric.
fn new_global_desc(namespace: &str, name: &str, help: &str) -> Result<Desc, prometheus::Error> {
    Desc::new(
        format!("{namespace}_{name}"),
        help.to_string(),
        Vec::new(),
        HashMap::new(),
    )
}

/// Builds a single-sample const metric family for one collection cycle.
fn const_metric_family(desc: &Desc, kind: MetricKind, value: f64) -> proto::MetricFamily {
    let mut metric = proto::Metric::default();
    match kind {
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(value);
            metric.set_gauge(gauge);
        }
    }

    let mut family = proto::MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(kind.proto_type());
    family.mut_metric().push(metric);
    family
}
