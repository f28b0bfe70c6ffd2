//! HTTP API: capacity reports, health checks and Prometheus metrics

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use capacity_lib::{
    health::{Component, ComponentStatus, HealthRegistry},
    models::{AlertSeverity, CapacityReport, CapacitySnapshot, CapacityTrend, TenantMappingEntry},
    observability::{ReportMetrics, StructuredLogger},
    source::{RecordSource, SourceError},
    CapacityEngine, TenantResolver,
};
use chrono::NaiveDate;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ReportMetrics,
    pub logger: StructuredLogger,
    pub source: Arc<dyn RecordSource>,
    pub engine: CapacityEngine,
    pub fetch_timeout: Duration,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ReportMetrics,
        logger: StructuredLogger,
        source: Arc<dyn RecordSource>,
        engine: CapacityEngine,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            source,
            engine,
            fetch_timeout,
        }
    }
}

/// Errors returned by the report endpoints
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Timeout(Duration),
    Source(SourceError),
    Internal(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Timeout(budget) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("fetching capacity data exceeded {} ms", budget.as_millis()),
            ),
            ApiError::Source(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound(_) | SourceError::Empty => ApiError::NotFound(e.to_string()),
            other => ApiError::Source(other),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub report_date: Option<NaiveDate>,
    pub tenant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tenant: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportDatesResponse {
    pub latest: Option<NaiveDate>,
    pub report_dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantsResponse {
    pub tenants: Vec<String>,
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Run a source fetch within the configured budget
///
/// Callers only start the engine once everything has arrived, so a timeout
/// never leaves a half-built report behind.
async fn fetch_within_budget<T, F>(state: &AppState, fetch: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(state.fetch_timeout, fetch).await {
        Ok(Ok(inputs)) => {
            state.health_registry.source_succeeded().await;
            Ok(inputs)
        }
        Ok(Err(e @ (SourceError::NotFound(_) | SourceError::Empty))) => Err(e.into()),
        Ok(Err(e)) => {
            let status = state.health_registry.source_failed(e.to_string()).await;
            warn!(error = %e, source_status = ?status, "Failed to read capacity data");
            Err(e.into())
        }
        Err(_) => {
            let status = state
                .health_registry
                .source_failed("Capacity data fetch timed out")
                .await;
            warn!(
                timeout_ms = state.fetch_timeout.as_millis() as u64,
                source_status = ?status,
                "Capacity data fetch timed out"
            );
            Err(ApiError::Timeout(state.fetch_timeout))
        }
    }
}

async fn fetch_inputs(
    state: &AppState,
    report_date: Option<NaiveDate>,
) -> Result<(CapacitySnapshot, Vec<TenantMappingEntry>), ApiError> {
    fetch_within_budget(state, async {
        let snapshot = state.source.fetch_snapshot(report_date).await?;
        let mappings = state.source.fetch_tenant_mappings().await?;
        Ok::<_, SourceError>((snapshot, mappings))
    })
    .await
}

/// Run CPU-bound engine work off the async workers
async fn run_engine<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(CapacityEngine) -> T + Send + 'static,
{
    let engine = state.engine.clone();
    match tokio::task::spawn_blocking(move || work(engine)).await {
        Ok(output) => {
            state.health_registry.set_healthy(Component::Engine).await;
            Ok(output)
        }
        Err(e) => {
            error!(error = %e, "Capacity engine task failed");
            state
                .health_registry
                .set_unhealthy(Component::Engine, "Engine task panicked")
                .await;
            Err(ApiError::Internal("capacity engine failed".to_string()))
        }
    }
}

/// Build the capacity report for one date (latest by default)
async fn report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<CapacityReport>, ApiError> {
    let started = Instant::now();

    let result = build_report(&state, query).await;
    match &result {
        Ok((report, records)) => {
            state.health_registry.report_served(report.report_date).await;
            state
                .metrics
                .observe_report_latency(started.elapsed().as_secs_f64());
            state.metrics.record_report(report, *records);
            state
                .logger
                .log_report(report, *records, started.elapsed().as_millis());
            for warning in &report.data_quality {
                state.logger.log_data_quality(warning);
            }
            for alert in report.alerts.by_severity(AlertSeverity::Urgent) {
                state.logger.log_alert(alert);
            }
        }
        Err(_) => state.metrics.inc_report_errors(),
    }

    result.map(|(report, _)| Json(report))
}

async fn build_report(
    state: &AppState,
    query: ReportQuery,
) -> Result<(CapacityReport, usize), ApiError> {
    let (snapshot, mappings) = fetch_inputs(state, query.report_date).await?;
    let records = snapshot.volumes.len();

    let tenant = query.tenant;
    let report = run_engine(state, move |engine| {
        engine.run(&snapshot, &mappings, tenant.as_deref())
    })
    .await?;
    Ok((report, records))
}

/// Capacity totals per reporting date, oldest first
async fn trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<CapacityTrend>, ApiError> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }
    }

    let (snapshots, mappings) = fetch_within_budget(&state, async {
        let snapshots = state
            .source
            .fetch_snapshots(query.start_date, query.end_date)
            .await?;
        let mappings = state.source.fetch_tenant_mappings().await?;
        Ok::<_, SourceError>((snapshots, mappings))
    })
    .await?;

    let tenant_filter = query
        .tenant
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let filter = tenant_filter.clone();
    let points = run_engine(&state, move |engine| {
        engine.trend(&snapshots, &mappings, filter.as_deref())
    })
    .await?;

    Ok(Json(CapacityTrend {
        start_date: query.start_date,
        end_date: query.end_date,
        tenant_filter,
        points,
    }))
}

async fn report_dates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReportDatesResponse>, ApiError> {
    let report_dates = state.source.available_report_dates().await?;
    Ok(Json(ReportDatesResponse {
        latest: report_dates.first().copied(),
        report_dates,
    }))
}

async fn tenants(State(state): State<Arc<AppState>>) -> Result<Json<TenantsResponse>, ApiError> {
    let mappings = state.source.fetch_tenant_mappings().await?;
    Ok(Json(TenantsResponse {
        tenants: TenantResolver::new(&mappings).tenant_names(),
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/report", get(report))
        .route("/api/v1/report-dates", get(report_dates))
        .route("/api/v1/trend", get(trend))
        .route("/api/v1/tenants", get(tenants))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
