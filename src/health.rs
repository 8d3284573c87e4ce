use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Liveness probe. No dependency checks: if this answers, the process is up.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "message": "🐾 Animal Translation Service is running!",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "port": state.config.server.port,
        "uptimeSeconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}
