use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taxiscore_pipeline::time::parse_pickup_datetime;
use taxiscore_pipeline::{
    HotspotPrediction, HotspotService, ModelKind, PipelineError, TripRequest, TripScore,
    TripScoringService,
};
use taxiscore_reference::geometry::Centroid;
use taxiscore_reference::{Month, ZoneLocator};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub const BANNER: &str = "Combined Trip Scoring + Hotspot Prediction API is running!";

const INVALID_TIME: &str = "Invalid time format. Use ISO format: YYYY-MM-DDTHH:MM:SSZ";
const INVALID_PICKUP_DATETIME: &str = "Invalid pickup_datetime format";

#[derive(Clone)]
pub struct AppState {
    pub trips: Arc<TripScoringService>,
    /// `None` when hotspot resources are not configured.
    pub hotspots: Option<Arc<HotspotService>>,
    /// `None` when no processed zone geometry is configured.
    pub locator: Option<Arc<ZoneLocator>>,
    pub metrics: Option<PrometheusHandle>,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(trips: Arc<TripScoringService>) -> Self {
        Self {
            trips,
            hotspots: None,
            locator: None,
            metrics: None,
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self, route: &'static str) -> u64 {
        counter!("taxiscore_http_requests_total", "route" => route).increment(1);
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    req_total: u64,
    scoring_months: Vec<Month>,
    hotspots_enabled: bool,
    hotspot_months: Vec<Month>,
    zone_lookup_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct HotspotQuery {
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
}

#[derive(Debug, Serialize)]
struct ZoneLookupResponse {
    zone: String,
    location_id: i64,
    borough: String,
    centroid: Centroid,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    fn with_details<S: Into<String>>(mut self, details: S) -> Self {
        self.details = Some(details.into());
        self
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        (self.status, payload).into_response()
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(Arc::new(state));
    let listener = bind_listener(addr).await?;
    info!("taxiscore API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/score_xgb", post(handle_score_xgb))
        .route("/score_lgbm", post(handle_score_lgbm))
        .route("/hotspots", get(handle_hotspots))
        .route("/zones/lookup", get(handle_zone_lookup))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_root(State(state): State<SharedState>) -> &'static str {
    state.record_request("root");
    BANNER
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request("health");
    let hotspot_months = state
        .hotspots
        .as_ref()
        .map(|service| service.cached_months())
        .unwrap_or_default();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_seconds(),
        req_total,
        scoring_months: state.trips.cached_months(),
        hotspots_enabled: state.hotspots.is_some(),
        hotspot_months,
        zone_lookup_enabled: state.locator.is_some(),
    })
}

async fn handle_metrics(State(state): State<SharedState>) -> Response {
    let req_total = state.record_request("metrics");

    let body = match &state.metrics {
        Some(handle) => handle.render(),
        None => {
            let uptime = state.uptime_seconds();
            let mut text =
                "# HELP taxiscore_http_requests_total Total number of HTTP requests handled\n"
                    .to_string();
            text.push_str("# TYPE taxiscore_http_requests_total counter\n");
            text.push_str(&format!("taxiscore_http_requests_total {req_total}\n"));
            text.push_str("# HELP taxiscore_uptime_seconds Uptime of the service in seconds\n");
            text.push_str("# TYPE taxiscore_uptime_seconds gauge\n");
            text.push_str(&format!("taxiscore_uptime_seconds {uptime}\n"));
            text
        }
    };

    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}

async fn handle_score_xgb(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<TripScore>, ApiError> {
    state.record_request("score_xgb");
    score(state, ModelKind::Xgb, body).await
}

async fn handle_score_lgbm(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<TripScore>, ApiError> {
    state.record_request("score_lgbm");
    score(state, ModelKind::Lgb, body).await
}

async fn score(
    state: SharedState,
    kind: ModelKind,
    body: Bytes,
) -> Result<Json<TripScore>, ApiError> {
    let request = trip_request(&body)?;

    let started = Instant::now();
    let service = state.trips.clone();
    let result = tokio::task::spawn_blocking(move || service.score(kind, &request))
        .await
        .map_err(|err| ApiError::internal(format!("scoring task failed: {err}")))?;

    histogram!("taxiscore_score_duration_seconds", "model" => kind.suffix())
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(score) => Ok(Json(score)),
        Err(err) => Err(score_error(kind, err)),
    }
}

fn str_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

/// The timestamp is checked before the zones: an absent or non-string
/// `pickup_datetime` is reported as a bad timestamp.
fn trip_request(body: &[u8]) -> Result<TripRequest, ApiError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("Invalid request body: {err}")))?;

    let pickup_datetime = str_field(&body, "pickup_datetime")
        .filter(|raw| parse_pickup_datetime(raw).is_ok())
        .ok_or_else(|| ApiError::bad_request(INVALID_PICKUP_DATETIME))?;
    let zone = |name: &str| {
        str_field(&body, name)
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid request body: missing {name}")))
    };

    Ok(TripRequest {
        pickup_zone: zone("pickup_zone")?,
        dropoff_zone: zone("dropoff_zone")?,
        pickup_datetime: pickup_datetime.to_string(),
    })
}

fn score_error(kind: ModelKind, err: PipelineError) -> ApiError {
    match err {
        PipelineError::InvalidDatetime(_) => ApiError::bad_request(INVALID_PICKUP_DATETIME),
        PipelineError::ScoringFailed(reason) | PipelineError::NonNumericFeature(reason) => {
            debug!(%kind, %reason, "trip could not be scored");
            ApiError::bad_request("Could not score trip")
        }
        other => {
            warn!(%kind, "trip scoring failed: {}", other);
            ApiError::internal(other.to_string())
        }
    }
}

async fn handle_hotspots(
    State(state): State<SharedState>,
    Query(query): Query<HotspotQuery>,
) -> Result<Json<Vec<HotspotPrediction>>, ApiError> {
    state.record_request("hotspots");
    let service = state
        .hotspots
        .clone()
        .ok_or_else(|| ApiError::service_unavailable("hotspot prediction is not configured"))?;

    let started = Instant::now();
    let result =
        tokio::task::spawn_blocking(move || service.predict(query.time.as_deref(), Utc::now()))
            .await
            .map_err(|err| ApiError::internal(format!("prediction task failed: {err}")))?;

    histogram!("taxiscore_hotspot_duration_seconds").record(started.elapsed().as_secs_f64());

    match result {
        Ok(predictions) => Ok(Json(predictions)),
        Err(PipelineError::InvalidTime(_)) => Err(ApiError::bad_request(INVALID_TIME)),
        Err(err @ PipelineError::UnsupportedMonth(_)) => {
            Err(ApiError::bad_request(err.to_string()))
        }
        Err(err) => {
            warn!("hotspot prediction failed: {}", err);
            Err(ApiError::internal("Internal server error").with_details(err.to_string()))
        }
    }
}

fn parse_coordinate(value: Option<&str>, name: &str) -> Result<f64, ApiError> {
    let value =
        value.ok_or_else(|| ApiError::bad_request(format!("missing query parameter {name}")))?;
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::bad_request(format!("invalid {name}: {value}")))
}

async fn handle_zone_lookup(
    State(state): State<SharedState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ZoneLookupResponse>, ApiError> {
    state.record_request("zone_lookup");
    let locator = state
        .locator
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("zone geometry is not configured"))?;

    let lat = parse_coordinate(query.lat.as_deref(), "lat")?;
    let lon = parse_coordinate(query.lon.as_deref(), "lon")?;

    let zone = locator
        .locate(lat, lon)
        .ok_or_else(|| ApiError::not_found(format!("no taxi zone contains ({lat}, {lon})")))?;

    Ok(Json(ZoneLookupResponse {
        zone: zone.name.clone(),
        location_id: zone.id,
        borough: zone.borough.clone(),
        centroid: zone.centroid,
    }))
}
