pub mod translate;

pub use translate::*;

use crate::health;
use actix_web::web;

/// Routes mounted under the `/api` scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/translate", web::post().to(translate))
        .route("/translate/stats", web::get().to(translation_stats))
        .route("/health", web::get().to(health::health_check));
}
