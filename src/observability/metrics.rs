//! Metrics collection and exposition.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the Prometheus exporter and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "installing Prometheus recorder failed");
        return;
    }
    tracing::info!("metrics server listening on http://{}", addr);
}
