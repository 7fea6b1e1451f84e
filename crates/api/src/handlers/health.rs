use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let connection = state.engine.connection_state();
    let status = if connection.is_error() { "degraded" } else { "ok" };

    Json(json!({
        "status": status,
        "connection": connection,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "alarm-dispatch",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
