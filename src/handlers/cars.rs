use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use chrono::{Datelike, Utc};

use crate::{
    AppState,
    extract::{ApiJson, ApiQuery},
    auth::AuthDealer,
    error::{AppError, AppResult},
    handlers::{clamp_limit, required},
    models::{
        Car, CarListQuery, CarsResponse, CreateCarRequest, DealerCarsResponse, NewCar,
        SubscriptionTier,
    },
};

/// Minimum asking price, in Naira, for the luxury feed and the luxury collection.
pub const LUXURY_PRICE_THRESHOLD: i64 = 150_000_000;
/// Highest asking price accepted for a listing (₦100 billion).
pub const MAX_CAR_PRICE: i64 = 100_000_000_000;

pub const DEFAULT_LATEST_LIMIT: i64 = 5;
pub const DEFAULT_LUXURY_LIMIT: i64 = 12;
pub const DEFAULT_PREMIUM_LIMIT: i64 = 6;

const EARLIEST_MODEL_YEAR: i32 = 1900;

const CACHE_FRESH: &str = "public, s-maxage=300, stale-while-revalidate=600";
const CACHE_DEGRADED: &str = "public, s-maxage=60, stale-while-revalidate=120";

fn cache_headers(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
    headers
}

/// get_latest_cars
///
/// [Public Route] Homepage "just arrived" strip. Failures degrade to an empty list with a
/// short cache lifetime, so the homepage never breaks on this feed.
#[utoipa::path(
    get,
    path = "/api/cars/latest",
    params(CarListQuery),
    responses((status = 200, description = "Latest arrivals", body = CarsResponse))
)]
pub async fn get_latest_cars(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CarListQuery>,
) -> (HeaderMap, Json<CarsResponse>) {
    let limit = clamp_limit(query.limit, DEFAULT_LATEST_LIMIT);
    match state.repo.latest_arrivals(limit).await {
        Ok(cars) => (cache_headers(CACHE_FRESH), Json(CarsResponse { cars })),
        Err(e) => {
            tracing::error!(error = %e, "latest cars query failed");
            (cache_headers(CACHE_DEGRADED), Json(CarsResponse { cars: vec![] }))
        }
    }
}

/// get_luxury_cars
///
/// [Public Route] Cars at or above the luxury threshold, most expensive first. The result
/// is filtered again after the query so nothing under the threshold is ever returned.
#[utoipa::path(
    get,
    path = "/api/cars/luxury",
    params(CarListQuery),
    responses(
        (status = 200, description = "Luxury cars", body = CarsResponse),
        (status = 500, description = "Database failure")
    )
)]
pub async fn get_luxury_cars(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CarListQuery>,
) -> AppResult<Json<CarsResponse>> {
    let limit = clamp_limit(query.limit, DEFAULT_LUXURY_LIMIT);
    let cars: Vec<_> = state
        .repo
        .cars_priced_from(LUXURY_PRICE_THRESHOLD, limit)
        .await?
        .into_iter()
        .filter(|listing| listing.car.price >= LUXURY_PRICE_THRESHOLD)
        .collect();

    tracing::debug!(count = cars.len(), "returning luxury cars");
    Ok(Json(CarsResponse { cars }))
}

/// get_premium_cars
///
/// [Public Route] Listings from premium and luxury dealers. Degrades like `get_latest_cars`.
#[utoipa::path(
    get,
    path = "/api/cars/premium",
    params(CarListQuery),
    responses((status = 200, description = "Premium dealer cars", body = CarsResponse))
)]
pub async fn get_premium_cars(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CarListQuery>,
) -> (HeaderMap, Json<CarsResponse>) {
    let limit = clamp_limit(query.limit, DEFAULT_PREMIUM_LIMIT);
    match state.repo.premium_dealer_cars(limit).await {
        Ok(cars) => (cache_headers(CACHE_FRESH), Json(CarsResponse { cars })),
        Err(e) => {
            tracing::error!(error = %e, "premium cars query failed");
            (cache_headers(CACHE_DEGRADED), Json(CarsResponse { cars: vec![] }))
        }
    }
}

/// validate_new_car
///
/// Field checks plus collection gating against the dealer's tier. Posting into the
/// `basic` "collection" is the same as posting into none.
pub fn validate_new_car(payload: CreateCarRequest, tier: SubscriptionTier) -> AppResult<NewCar> {
    let (Some(make), Some(model), Some(year), Some(price)) = (
        required(payload.make),
        required(payload.model),
        payload.year,
        payload.price,
    ) else {
        return Err(AppError::validation(
            "Missing required fields: make, model, year, price",
        ));
    };

    let latest_year = Utc::now().year() + 1;
    if !(EARLIEST_MODEL_YEAR..=latest_year).contains(&year) {
        return Err(AppError::validation(format!(
            "Year must be between {EARLIEST_MODEL_YEAR} and {latest_year}"
        )));
    }
    if price <= 0 {
        return Err(AppError::validation("Price must be greater than zero"));
    }
    if price > MAX_CAR_PRICE {
        return Err(AppError::validation("Price must not exceed ₦100,000,000,000"));
    }

    let collection = payload
        .collection
        .filter(|collection| *collection != SubscriptionTier::Basic);

    if let Some(collection) = collection {
        if !tier.can_post_in(collection) {
            return Err(AppError::forbidden(format!(
                "Your {} subscription does not allow posting in the {} Collection",
                tier.display_name(),
                collection.collection_name()
            )));
        }
        if collection == SubscriptionTier::Luxury && price < LUXURY_PRICE_THRESHOLD {
            return Err(AppError::validation(
                "Luxury collection listings must be priced at ₦150,000,000 or more",
            ));
        }
    }

    Ok(NewCar {
        make,
        model,
        year,
        price,
        description: required(payload.description),
        image_urls: payload
            .image_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect(),
        collection,
    })
}

#[utoipa::path(
    get,
    path = "/api/dealer/cars",
    responses((status = 200, description = "Dealer inventory", body = DealerCarsResponse))
)]
pub async fn get_dealer_cars(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
) -> AppResult<Json<DealerCarsResponse>> {
    let cars = state.repo.list_dealer_cars(dealer.id).await?;
    Ok(Json(DealerCarsResponse { cars }))
}

/// create_car
///
/// [Dealer Route] New listings start `active` and unverified; moderation flags are
/// admin-only.
#[utoipa::path(
    post,
    path = "/api/dealer/cars",
    request_body = CreateCarRequest,
    responses(
        (status = 201, description = "Listing created", body = Car),
        (status = 400, description = "Invalid listing"),
        (status = 403, description = "Collection not available on this tier")
    )
)]
pub async fn create_car(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCarRequest>,
) -> AppResult<(StatusCode, Json<Car>)> {
    let new_car = validate_new_car(payload, dealer.subscription_tier)?;
    let car = state.repo.create_car(dealer.id, new_car).await?;

    tracing::info!(dealer_id = %dealer.id, car_id = %car.id, "car listing created");
    Ok((StatusCode::CREATED, Json(car)))
}
