use crate::{
    AppState,
    handlers::{cars, dealer},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. The car feeds only ever return unblocked listings of
/// active dealers; that filter lives in the repository queries.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/dealer/register", post(dealer::register_dealer))
        .route("/dealer/login", post(dealer::login_dealer))
        // Works with or without a valid session; always clears the cookie.
        .route("/dealer/logout", post(dealer::logout_dealer))
        .route("/dealer/setup-password", post(dealer::setup_password))
        .route("/cars/latest", get(cars::get_latest_cars))
        .route("/cars/luxury", get(cars::get_luxury_cars))
        .route("/cars/premium", get(cars::get_premium_cars))
}
