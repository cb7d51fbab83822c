use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Moderation and onboarding. Any active admin may use these; tier changes and bank
/// verification additionally require the `admin` or `super_admin` role, checked in the
/// handlers.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::get_admin_stats))
        .route(
            "/dealers",
            get(admin::list_dealers).post(admin::onboard_dealer),
        )
        .route("/approve-dealer", post(admin::approve_dealer))
        .route("/dealers/{id}/suspend", post(admin::suspend_dealer))
        .route("/dealers/{id}/reactivate", post(admin::reactivate_dealer))
        .route(
            "/dealers/{id}/subscription",
            put(admin::update_subscription),
        )
        .route(
            "/dealer-bank-details",
            get(admin::list_bank_details).post(admin::verify_bank_details),
        )
        .route("/cars/{id}/flags", put(admin::update_car_flags))
}
