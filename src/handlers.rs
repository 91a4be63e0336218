use crate::analysis::AnthropicClient;
use crate::batch::run_batch;
use crate::config::Config;
use crate::dashboard::{AnalysisView, BatchDashboard, CustomerView};
use crate::dataset::CustomerDataset;
use crate::errors::{AppError, ResultExt};
use crate::models::BatchRequest;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest request body accepted by the API routes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Customer records loaded at startup (read-only).
    pub dataset: Arc<CustomerDataset>,
    /// Client for the Messages API.
    pub client: AnthropicClient,
}

impl AppState {
    pub fn new(config: Config, dataset: CustomerDataset) -> Result<Self, AppError> {
        let client = AnthropicClient::new(&config)?;
        Ok(Self {
            config,
            dataset: Arc::new(dataset),
            client,
        })
    }
}

/// Read-only customer routes.
pub fn customer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/customers", get(list_customers))
        .route("/api/v1/customers/:name", get(get_customer))
        .route("/api/v1/records/:index", get(get_customer_at))
}

/// Routes that call the Messages API and spend credits.
pub fn analysis_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/customers/:name/analysis", post(analyze_customer))
        .route("/api/v1/analysis/batch", post(analyze_batch))
}

/// Per-IP rate limit applied to the analysis routes.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Seconds between replenished requests.
    pub per_second: u64,
    /// Requests allowed back to back before limiting starts.
    pub burst_size: u32,
}

// Each analysis spends API credits: 1 request/second per IP, burst of 5
impl Default for RateLimit {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 5,
        }
    }
}

/// Full application as served: routes plus rate limiting, body limit, CORS
/// and request tracing.
///
/// `/health` and the read-only customer routes bypass the rate limiter.
pub fn app(state: Arc<AppState>, limit: RateLimit) -> Result<Router, AppError> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(limit.per_second)
            .burst_size(limit.burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| AppError::InternalError("Invalid rate limiter configuration".into()))?,
    );

    let api_routes = customer_routes()
        .merge(analysis_routes().layer(GovernorLayer {
            config: governor_conf,
        }))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let app = Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}

/// Routes without any middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(customer_routes())
        .merge(analysis_routes())
        .with_state(state)
}

/// Health check endpoint.
///
/// Reports how many customers are loaded and whether analyses can run.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "customer-health-api",
            "version": env!("CARGO_PKG_VERSION"),
            "customers": state.dataset.len(),
            "analysis_configured": state.client.has_credential(),
        })),
    )
}

/// GET /api/v1/customers
///
/// Lists customer names in dataset order.
pub async fn list_customers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "count": state.dataset.len(),
        "names": state.dataset.names(),
    }))
}

/// GET /api/v1/customers/:name
///
/// Returns the customer record and its metric cards.
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<CustomerView>, AppError> {
    tracing::info!("GET /customers/{}", name);
    let record = state.dataset.lookup_by_name(&name)?;
    Ok(Json(CustomerView::new(record)))
}

/// GET /api/v1/records/:index
///
/// Returns the customer at a zero-based position.
pub async fn get_customer_at(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<CustomerView>, AppError> {
    tracing::info!("GET /records/{}", index);
    let record = state.dataset.at(index)?;
    Ok(Json(CustomerView::new(record)))
}

/// POST /api/v1/customers/:name/analysis
///
/// Runs one analysis for the named customer. Errors come back as a JSON
/// `error` message and no view.
pub async fn analyze_customer(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<AnalysisView>, AppError> {
    tracing::info!("POST /customers/{}/analysis", name);
    let record = state.dataset.lookup_by_name(&name)?;

    let result = state
        .client
        .analyze(record)
        .await
        .map_err(AppError::from)
        .with_context(|| format!("Analysis of '{}' failed", name))?;

    Ok(Json(AnalysisView::new(record, result)))
}

/// POST /api/v1/analysis/batch
///
/// Analyzes the first `count` customers one after another and returns the
/// dashboard. Failed customers are listed but excluded from the metrics.
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchDashboard>, AppError> {
    tracing::info!("POST /analysis/batch - count: {}", request.count);

    if let Some(cap) = state.config.max_batch_size {
        if request.count > cap {
            return Err(AppError::BadRequest(format!(
                "count must not exceed {}",
                cap
            )));
        }
    }

    let records = state.dataset.prefix(request.count)?;
    let report = run_batch(&state.client, records).await?;

    Ok(Json(BatchDashboard::new(report)))
}
