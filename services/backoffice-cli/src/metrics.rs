//! Prometheus rendering of the session pipeline counters
//!
//! The library crates record through the `metrics` facade; this module
//! installs the recorder that collects them. `--metrics` prints the text
//! exposition to stdout after the command finishes.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}
