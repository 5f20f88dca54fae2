use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::SharedState;

pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let directory = state.directory.read().await;
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(json!({
            "status": "ok",
            "providers": directory.len(),
            "catalog_last_updated": directory.last_updated(),
        })),
    )
}
