//! Axum REST API handlers

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::engine::detector::{Detect, DetectError};
use crate::service::PlanService;

use super::dto::*;

/// Application state shared across handlers.
///
/// `service` stays empty until startup initialization publishes the loaded
/// model; handlers report the service as unavailable until then.
pub struct AppState<D: Detect> {
    service: RwLock<Option<Arc<PlanService<D>>>>,
    environment: String,
}

impl<D: Detect> AppState<D> {
    pub fn new(environment: String) -> Self {
        Self {
            service: RwLock::new(None),
            environment,
        }
    }

    /// Publish the initialized service; flips the health route to ready.
    pub async fn publish(&self, service: Arc<PlanService<D>>) {
        *self.service.write().await = Some(service);
    }

    async fn service(&self) -> Option<Arc<PlanService<D>>> {
        self.service.read().await.clone()
    }
}

/// Create the REST API router
pub fn create_router<D: Detect>(state: Arc<AppState<D>>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health_handler::<D>).post(analyze_handler::<D>))
        .route("/health", get(health_handler::<D>))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024)) // 50MB limit for scanned plans
        .layer(build_cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Empty allow-list permits any origin.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Liveness and readiness check
async fn health_handler<D: Detect>(State(state): State<Arc<AppState<D>>>) -> Json<HealthResponse> {
    let ready = state.service().await.is_some();

    Json(HealthResponse {
        status: if ready { "ok" } else { "initializing" }.to_string(),
        env: state.environment.clone(),
        model_loaded: ready,
    })
}

/// Analyze an uploaded floor-plan image
async fn analyze_handler<D: Detect>(
    State(state): State<Arc<AppState<D>>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = state.service().await.ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Model is still loading", "NOT_READY")),
        )
    })?;

    let mut image_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(&e.to_string(), "MULTIPART_ERROR")),
        )
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            image_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse::new(&e.to_string(), "READ_ERROR")),
                        )
                    })?
                    .to_vec(),
            );
        }
    }

    let image_data = image_data.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Missing image field", "MISSING_IMAGE")),
        )
    })?;

    let analysis = service.analyze(&image_data).await.map_err(|e| match e {
        DetectError::Decode(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(&e.to_string(), "INVALID_IMAGE")),
        ),
        DetectError::Inference(_) => {
            error!("Analysis failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(&e.to_string(), "INFERENCE_FAILED")),
            )
        }
    })?;

    Ok(Json(AnalyzeResponse::from(&analysis)))
}
