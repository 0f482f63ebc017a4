use std::sync::Arc;

use warp::http::StatusCode;
use warp::Filter;

use super::PrometheusReporter;
use crate::application::services::RelayHub;

/// Snapshot of one member connection for the health endpoints
#[derive(Debug, serde::Serialize)]
pub struct ConnectionHealth {
    pub name: String,
    pub state: String,
    pub established: bool,
    pub uptime_seconds: Option<u64>,
    pub transitions: usize,
}

/// Body of `/health` and `/readyz`
#[derive(Debug, serde::Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub connections: Vec<ConnectionHealth>,
}

impl HealthReport {
    /// The bridge is ready once any connection is established
    pub fn from_hub(hub: &RelayHub) -> Self {
        let connections: Vec<ConnectionHealth> = hub
            .connections()
            .map(|connection| ConnectionHealth {
                name: connection.name().to_string(),
                state: connection.state().to_string(),
                established: connection.is_established(),
                uptime_seconds: connection.uptime().map(|uptime| uptime.as_secs()),
                transitions: connection.transition_count(),
            })
            .collect();

        let status = if connections.iter().any(|c| c.established) {
            "ready"
        } else {
            "waiting"
        };

        Self {
            status,
            service: "relay-bridge",
            version: env!("CARGO_PKG_VERSION"),
            connections,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

pub async fn serve_metrics(port: u16, hub: Arc<RelayHub>) {
    let metrics_route = warp::path("metrics").map(|| {
        let body = PrometheusReporter::gather_metrics();
        warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4; charset=utf-8")
    });

    let health_hub = Arc::clone(&hub);
    let health_route = warp::path("health")
        .map(move || warp::reply::json(&HealthReport::from_hub(&health_hub)));

    let liveness_route = warp::path("livez").map(|| warp::reply::with_status("OK", StatusCode::OK));

    let readiness_route = warp::path("readyz").map(move || {
        let report = HealthReport::from_hub(&hub);
        let code = if report.is_ready() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        warp::reply::with_status(warp::reply::json(&report), code)
    });

    let routes = metrics_route
        .or(health_route)
        .or(liveness_route)
        .or(readiness_route);

    tracing::info!("Metrics server starting on port {}", port);

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}
