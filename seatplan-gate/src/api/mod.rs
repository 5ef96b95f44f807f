mod login;
mod time;

pub use login::MAX_BODY_BYTES;
pub use time::TimeReference;

use crate::config::Config;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderValue, Method, header};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 请求体上限和超时在 login handler 内处理，保证错误响应都是 `{ error }`
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .route("/api/login", post(login::login))
        .route("/api/time", get(time::time))
        .route("/health", get(health))
        .layer(cors(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
