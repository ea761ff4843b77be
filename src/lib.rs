//! Prometheus exporter for Nchan publish/subscribe servers.
//!
//! Scrapes the `nchan_stub_status` page (and optionally the host NGINX
//! `stub_status` page), parses the fixed-format report, and republishes the
//! values as Prometheus metrics.

pub mod client;
pub mod collector;
pub mod status;
