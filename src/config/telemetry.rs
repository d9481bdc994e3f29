use clap::Parser;
use serde::Deserialize;

/// Default port the Prometheus exporter listens on.
pub const DEFAULT_METRICS_PORT: u16 = 9091;

/// Telemetry and metrics options.
#[derive(Debug, Clone, Parser, Deserialize)]
pub struct TelemetryOpts {
    /// The port on which to expose Prometheus metrics
    #[clap(short, long, env = "CUSTODY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,
    /// Disable the Prometheus exporter entirely
    #[clap(long, env = "CUSTODY_DISABLE_METRICS", default_value_t = false)]
    disable_metrics: bool,
}

impl Default for TelemetryOpts {
    fn default() -> Self {
        Self { metrics_port: DEFAULT_METRICS_PORT, disable_metrics: false }
    }
}

impl TelemetryOpts {
    /// The metrics port, if metrics are enabled.
    pub fn metrics_port(&self) -> Option<u16> {
        if self.disable_metrics {
            None
        } else {
            Some(self.metrics_port)
        }
    }
}
