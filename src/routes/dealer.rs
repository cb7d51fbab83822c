use crate::{
    AppState,
    handlers::{bank, cars, dealer, uploads},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Dealer Router Module
///
/// Dashboard endpoints under `/dealer`. Merged next to the public `/dealer/*` routes
/// (register, login), so paths are spelled out instead of nested. The router is wrapped
/// in the dealer session layer; each handler also takes `AuthDealer` to know whose
/// data it is touching.
pub fn dealer_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/dealer/me", get(dealer::get_me))
        .route("/dealer/permissions", get(dealer::get_permissions))
        // Premium feature; tier checked in the handler.
        .route("/dealer/analytics", get(dealer::get_analytics))
        .route(
            "/dealer/bank-details",
            get(bank::get_bank_details)
                .post(bank::save_bank_details)
                .delete(bank::delete_bank_details),
        )
        .route("/dealer/cars", get(cars::get_dealer_cars).post(cars::create_car))
        .route("/dealer/uploads", post(uploads::get_presigned_upload_url))
}
