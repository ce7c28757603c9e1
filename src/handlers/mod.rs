// handlers/mod.rs - 2-Tier Handler Architecture
//
// Public (no session) → Protected (session cookie with bearer token)
pub mod protected; // Tier 2: session required, redirects to /login otherwise
pub mod public; // Tier 1: login only

use axum::response::Json;
use serde_json::{json, Value};

/// GET /health - liveness only; the upstream API is not probed.
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
        }
    }))
}
