use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::ConnectionState;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Connection state (0=Idle, 1=Opening, 2=Initializing, 3=Connected, 4=Closing)
    pub static ref CONNECTION_STATE: GaugeVec = GaugeVec::new(
        Opts::new("relay_connection_state", "Current lifecycle state per connection"),
        &["connection"]
    ).expect("metric can be created");

    // Restarts scheduled after a lost or failed connection
    pub static ref RECONNECTS: IntCounterVec = IntCounterVec::new(
        Opts::new("relay_reconnects_total", "Total number of scheduled reconnects"),
        &["connection"]
    ).expect("metric can be created");

    // Delay of the most recently scheduled reconnect
    pub static ref RECONNECT_DELAY_SECONDS: GaugeVec = GaugeVec::new(
        Opts::new("relay_reconnect_delay_seconds", "Delay before the pending reconnect"),
        &["connection"]
    ).expect("metric can be created");

    pub static ref MESSAGES_RELAYED: IntCounterVec = IntCounterVec::new(
        Opts::new("relay_messages_relayed_total", "Inbound messages relayed to peers"),
        &["origin"]
    ).expect("metric can be created");

    pub static ref SENDS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("relay_sends_dropped_total", "Sends dropped because the target was down"),
        &["connection"]
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(CONNECTION_STATE.clone()))?;
        REGISTRY.register(Box::new(RECONNECTS.clone()))?;
        REGISTRY.register(Box::new(RECONNECT_DELAY_SECONDS.clone()))?;
        REGISTRY.register(Box::new(MESSAGES_RELAYED.clone()))?;
        REGISTRY.register(Box::new(SENDS_DROPPED.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_state_change(&self, connection: &str, state: &ConnectionState) {
        CONNECTION_STATE
            .with_label_values(&[connection])
            .set(state.as_metric());
    }

    fn report_reconnect_scheduled(&self, connection: &str, delay: Duration) {
        RECONNECTS.with_label_values(&[connection]).inc();
        RECONNECT_DELAY_SECONDS
            .with_label_values(&[connection])
            .set(delay.as_secs_f64());
    }

    fn report_message_relayed(&self, origin: &str) {
        MESSAGES_RELAYED.with_label_values(&[origin]).inc();
    }

    fn report_send_dropped(&self, connection: &str) {
        SENDS_DROPPED.with_label_values(&[connection]).inc();
    }
}
