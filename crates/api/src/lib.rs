//! Risk Engine API Server
//!
//! REST API over the risk engine: reading submission, policy reload,
//! postures, trends, alert triage, and diagnostics.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put, MethodRouter},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use monitor::{CycleReport, Diagnostic, MonitoringLoop, ReadingSubmitter, RiskEngine};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, RwLock};
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, subscriber::SetGlobalDefaultError, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod error;
pub mod rate_limit;
mod routes;
pub mod settings;

pub use error::{ApiError, ServerError};
pub use rate_limit::{create_governor_config, DefaultGovernorConfig, RateLimitConfig};
pub use settings::{LogFormat, LoggingSettings, ServerSettings, Settings};

/// Diagnostics kept for the diagnostics endpoint
pub const MAX_RECENT_DIAGNOSTICS: usize = 200;

/// Cycle history fed by the monitoring loop's report sink
#[derive(Debug, Default)]
pub struct ReportLog {
    pub last_cycle: Option<u64>,
    /// Newest last
    pub diagnostics: VecDeque<Diagnostic>,
}

impl ReportLog {
    fn record(&mut self, report: CycleReport) {
        self.last_cycle = Some(report.cycle);
        for diagnostic in report.diagnostics {
            if self.diagnostics.len() == MAX_RECENT_DIAGNOSTICS {
                self.diagnostics.pop_front();
            }
            self.diagnostics.push_back(diagnostic);
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<RiskEngine>,
    /// Queue into the monitoring loop
    pub submitter: ReadingSubmitter,
    pub reports: RwLock<ReportLog>,
    /// Prometheus recorder, when installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(engine: Arc<RiskEngine>, submitter: ReadingSubmitter) -> Self {
        Self {
            engine,
            submitter,
            reports: RwLock::new(ReportLog::default()),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub async fn record_report(&self, report: CycleReport) {
        self.reports.write().await.record(report);
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub subjects: usize,
    pub policies: usize,
    pub open_alerts: usize,
    pub config_gaps: usize,
}

/// Create the application router
///
/// When `rate_limit` is given, the write endpoints are wrapped in a
/// governor layer keyed by peer IP.
pub fn create_router(
    state: SharedState,
    rate_limit: Option<Arc<DefaultGovernorConfig>>,
) -> Router {
    let limited = |route: MethodRouter<SharedState>| match &rate_limit {
        Some(config) => route.layer(GovernorLayer {
            config: config.clone(),
        }),
        None => route,
    };

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/readings", limited(post(routes::readings::submit_readings)))
        .route(
            "/api/v1/policies",
            get(routes::policies::get_policies)
                .merge(limited(put(routes::policies::put_policies))),
        )
        .route("/api/v1/postures", get(routes::postures::list_postures))
        .route("/api/v1/postures/:subject", get(routes::postures::get_posture))
        .route("/api/v1/trends/:subject/:signal", get(routes::trends::get_trend))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/alerts/summary", get(routes::alerts::get_summary))
        .route("/api/v1/alerts/:id", get(routes::alerts::get_alert))
        .route("/api/v1/alerts/:id/status", limited(post(routes::alerts::set_status)))
        .route("/api/v1/diagnostics", get(routes::diagnostics::get_diagnostics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        subjects: state.engine.subjects().len(),
        policies: state.engine.policies().len(),
        open_alerts: state.engine.alerts().open_count(),
        config_gaps: state.engine.config_gaps().len(),
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics recorder not installed".to_string(),
        ),
    }
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), SetGlobalDefaultError> {
    let level = settings.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match settings.format {
        LogFormat::Plain => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the engine, its monitoring loop, and the server until Ctrl-C
pub async fn run_server(settings: Settings) -> Result<(), ServerError> {
    let metrics = PrometheusBuilder::new().install_recorder()?;
    let engine = Arc::new(RiskEngine::new(&settings.engine)?);

    let (report_tx, mut report_rx) = mpsc::channel(64);
    let (monitor, submitter) = MonitoringLoop::new(engine.clone(), settings.engine.monitor.clone());
    let monitor = monitor.with_report_sink(report_tx);

    let state = Arc::new(AppState::new(engine, submitter).with_metrics(metrics));

    let (stop_tx, stop_rx) = watch::channel(false);
    let monitor_handle = tokio::spawn(monitor.run(stop_rx));

    let report_state = state.clone();
    tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            report_state.record_report(report).await;
        }
    });

    let app = create_router(state, create_governor_config(&settings.server.rate_limit));

    let addr = settings.server.addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Drains readings still queued
    let _ = stop_tx.send(true);
    let cycles = monitor_handle.await?;
    info!("Server stopped after {} monitoring cycles", cycles);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use monitor::{EngineConfig, MonitorConfig};
    use serde_json::{json, Value};
    use signal_policy::{Reading, SignalType};
    use tower::ServiceExt;

    fn test_state() -> (SharedState, MonitoringLoop) {
        let engine = Arc::new(RiskEngine::new(&EngineConfig::default()).unwrap());
        let (monitor, submitter) = MonitoringLoop::new(engine.clone(), MonitorConfig::default());
        (Arc::new(AppState::new(engine, submitter)), monitor)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _monitor) = test_state();
        let app = create_router(state, None);

        let response = send(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["policies"], 7);
        assert_eq!(body["open_alerts"], 0);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (state, _monitor) = test_state();
        let app = create_router(state, None);
        let response = send(&app, "GET", "/metrics", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_submit_readings_through_loop() {
        let (state, monitor) = test_state();
        let (report_tx, mut report_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.with_report_sink(report_tx).run(stop_rx));
        let app = create_router(state.clone(), None);

        let response = send(
            &app,
            "POST",
            "/api/v1/readings",
            Some(json!({
                "readings": [
                    { "subject_id": "model-a", "signal_type": "data_drift", "value": 0.25 },
                    { "subject_id": "model-a", "signal_type": "vendor_sla", "value": 3.0 }
                ]
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(response).await["accepted"], 2);

        let report = report_rx.recv().await.unwrap();
        assert_eq!(report.raised(), 1);
        state.record_report(report).await;

        let body = json_body(send(&app, "GET", "/api/v1/postures/model-a", None).await).await;
        assert_eq!(body["tier"], "critical");

        let body = json_body(send(&app, "GET", "/api/v1/diagnostics", None).await).await;
        assert_eq!(body["config_gaps"], json!(["vendor_sla"]));
        assert_eq!(body["last_cycle"], 1);
        assert_eq!(body["recent"].as_array().unwrap().len(), 1);

        stop_tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_submit_empty_batch_rejected() {
        let (state, _monitor) = test_state();
        let app = create_router(state, None);
        let response = send(&app, "POST", "/api/v1/readings", Some(json!({ "readings": [] }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_after_loop_stopped() {
        let (state, monitor) = test_state();
        drop(monitor);
        let app = create_router(state, None);
        let response = send(
            &app,
            "POST",
            "/api/v1/readings",
            Some(json!({ "readings": [{ "subject_id": "m", "signal_type": "data_drift", "value": 0.1 }] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_alert_lifecycle_routes() {
        let (state, _monitor) = test_state();
        state.engine.process_subject(
            "model-a",
            &[Reading::new("model-a", SignalType::DataDrift, 0.25)],
        );
        let app = create_router(state, None);

        let body = json_body(send(&app, "GET", "/api/v1/alerts?status=active", None).await).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], "model-a:data_drift:1");
        assert_eq!(body["data"][0]["severity"], "critical");

        let response = send(
            &app,
            "POST",
            "/api/v1/alerts/model-a:data_drift:1/status",
            Some(json!({ "status": "resolved" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(
            &app,
            "POST",
            "/api/v1/alerts/model-a:data_drift:1/status",
            Some(json!({ "status": "investigating", "note": "checking feature store" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "investigating");

        let body = json_body(send(&app, "GET", "/api/v1/alerts/summary", None).await).await;
        assert_eq!(body["investigating"], 1);
        assert_eq!(body["open_by_severity"]["critical"], 1);

        let response = send(&app, "GET", "/api/v1/alerts/missing:data_drift:1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            "POST",
            "/api/v1/alerts/missing:data_drift:1/status",
            Some(json!({ "status": "false-positive" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_alert_filters_and_limit() {
        let (state, _monitor) = test_state();
        for subject in ["model-a", "model-b", "model-c"] {
            state.engine.process_subject(
                subject,
                &[
                    Reading::new(subject, SignalType::DataDrift, 0.09),
                    Reading::new(subject, SignalType::SecurityScore, 50.0),
                ],
            );
        }
        let app = create_router(state, None);

        let body = json_body(send(&app, "GET", "/api/v1/alerts?severity=critical", None).await).await;
        assert_eq!(body["count"], 3);

        let body = json_body(send(&app, "GET", "/api/v1/alerts?signal=data_drift&subject=model-b", None).await).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["severity"], "medium");

        let body = json_body(send(&app, "GET", "/api/v1/alerts?limit=2", None).await).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["total"], 6);
        assert_eq!(body["data"][0]["severity"], "critical");
    }

    #[tokio::test]
    async fn test_policy_reload_routes() {
        let (state, _monitor) = test_state();
        let app = create_router(state, None);

        let response = send(
            &app,
            "PUT",
            "/api/v1/policies",
            Some(json!({ "policies": { "data_drift": { "boundaries": [0.3, 0.1] } } })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(send(&app, "GET", "/api/v1/policies", None).await).await;
        assert_eq!(body["policies"].as_object().unwrap().len(), 7);

        let response = send(
            &app,
            "PUT",
            "/api/v1/policies",
            Some(json!({ "policies": { "data_drift": { "boundaries": [0.5] } } })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["loaded"], 1);
    }

    #[tokio::test]
    async fn test_trend_route() {
        let (state, _monitor) = test_state();
        for v in [0.05, 0.08, 0.12] {
            state
                .engine
                .process_subject("model-a", &[Reading::new("model-a", SignalType::DataDrift, v)]);
        }
        let app = create_router(state, None);

        let body = json_body(send(&app, "GET", "/api/v1/trends/model-a/data_drift", None).await).await;
        assert_eq!(body["trend"], "rising");
        assert_eq!(body["history"], json!([0.05, 0.08, 0.12]));
        assert_eq!(body["observations"], 3);

        let body = json_body(send(&app, "GET", "/api/v1/trends/ghost/data_drift", None).await).await;
        assert_eq!(body["trend"], "unknown");
        assert_eq!(body["observations"], 0);
    }

    #[test]
    fn test_report_log_is_bounded() {
        let mut log = ReportLog::default();
        let report = CycleReport {
            cycle: 7,
            diagnostics: (0..MAX_RECENT_DIAGNOSTICS + 5)
                .map(|i| Diagnostic::task(&format!("model-{}", i), "failed"))
                .collect(),
            ..CycleReport::default()
        };
        log.record(report);
        assert_eq!(log.last_cycle, Some(7));
        assert_eq!(log.diagnostics.len(), MAX_RECENT_DIAGNOSTICS);
        assert_eq!(log.diagnostics[0].subject_id, "model-5");
    }
}
