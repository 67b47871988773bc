use axum::Json;
use serde_json::{json, Value};

pub(crate) async fn check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
