use std::collections::BTreeMap;
use std::sync::Arc;
use axum::{
    Router,
    routing::get,
    extract::{State, Json},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use crate::context::AppContext;
use crate::error::Error;
use crate::observability::metrics;
use crate::query::QueryService;
use crate::refresh::{RefreshResult, Scheduler};
use crate::types::snapshot::IndexSnapshot;

pub const LIVENESS_TEXT: &str = "Market Indices API is running";
pub const UPDATE_MESSAGE: &str = "Market indices updated successfully";

pub struct ApiState {
    pub query: Arc<QueryService>,
    pub scheduler: Arc<Scheduler>,
}

impl ApiState {
    pub fn from_context(context: &AppContext) -> Self {
        ApiState {
            query: context.query.clone(),
            scheduler: context.scheduler.clone(),
        }
    }
}

pub fn create_router(state: Arc<ApiState>, allow_any_origin: bool) -> Router {
    let router = Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/market-indices", get(get_market_indices))
        .route("/update-market-indices", get(update_market_indices))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if allow_any_origin {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Request-level failure, rendered as `500 {"error": ...}`.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        ).into_response()
    }
}

async fn home() -> &'static str {
    LIVENESS_TEXT
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics() -> Result<Response, ApiError> {
    let body = metrics::render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ).into_response())
}

async fn get_market_indices(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<BTreeMap<String, IndexSnapshot>>, ApiError> {
    Ok(Json(state.query.latest().await?))
}

#[derive(Serialize)]
struct UpdateResponse {
    message: &'static str,
    data: Arc<RefreshResult>,
}

/// Per-index failures stay inside `data`. A cycle that failed, or that reached
/// the store for no index at all, is an HTTP error.
async fn update_market_indices(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let result = state.scheduler.trigger_manual().await?;
    result.ensure_store_reached()?;
    tracing::info!(
        "Manual refresh {} finished: {}/{} updated",
        result.cycle_id,
        result.updated_count(),
        result.len()
    );

    Ok(Json(UpdateResponse {
        message: UPDATE_MESSAGE,
        data: result,
    }))
}
