//! Router and handlers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use suhua_core::{AppError, Config};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::aggregator::{Aggregator, DashboardData};
use crate::images::{ImageKind, ImageProxy, RADAR_IMAGE_PATH, TYPHOON_IMAGE_PATH};

pub struct AppState {
    pub aggregator: Aggregator,
    pub images: ImageProxy,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            aggregator: Aggregator::from_config(config)?,
            images: ImageProxy::new(&config.cwa)?,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/api/dashboard-data", get(dashboard_data))
        .route(RADAR_IMAGE_PATH, get(radar_image))
        .route(TYPHOON_IMAGE_PATH, get(typhoon_image))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(
                        |request: &axum::http::Request<axum::body::Body>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                path = %request.uri().path(),
                            )
                        },
                    ),
                )
                .layer(CorsLayer::permissive()),
        )
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "Su-Hua dashboard backend is running" }))
}

async fn dashboard_data(State(state): State<Arc<AppState>>) -> Json<DashboardData> {
    Json(state.aggregator.dashboard().await)
}

async fn radar_image(State(state): State<Arc<AppState>>) -> Response {
    proxy_image(&state, ImageKind::Radar).await
}

async fn typhoon_image(State(state): State<Arc<AppState>>) -> Response {
    proxy_image(&state, ImageKind::Typhoon).await
}

async fn proxy_image(state: &AppState, kind: ImageKind) -> Response {
    match state.images.fetch(kind).await {
        Ok(image) => (
            [(header::CONTENT_TYPE, image.content_type)],
            image.bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(kind = kind.name(), error = %e, "Image proxy failed");
            (StatusCode::BAD_GATEWAY, e.user_message()).into_response()
        }
    }
}
