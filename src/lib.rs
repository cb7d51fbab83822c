use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod lifecycle;
pub mod maintenance;
pub mod models;
pub mod password;
pub mod permissions;
pub mod rate_limit;
pub mod repository;
pub mod storage;

pub mod routes;
use auth::{AdminUser, AuthDealer};
use routes::{admin, dealer, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use rate_limit::LoginRateLimiter;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every handler and schema, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::dealer::register_dealer, handlers::dealer::login_dealer,
        handlers::dealer::logout_dealer, handlers::dealer::setup_password,
        handlers::dealer::get_me, handlers::dealer::get_permissions,
        handlers::dealer::get_analytics,
        handlers::bank::get_bank_details, handlers::bank::save_bank_details,
        handlers::bank::delete_bank_details,
        handlers::cars::get_latest_cars, handlers::cars::get_luxury_cars,
        handlers::cars::get_premium_cars, handlers::cars::get_dealer_cars,
        handlers::cars::create_car,
        handlers::uploads::get_presigned_upload_url,
        handlers::admin::get_admin_stats, handlers::admin::list_dealers,
        handlers::admin::onboard_dealer, handlers::admin::approve_dealer,
        handlers::admin::suspend_dealer, handlers::admin::reactivate_dealer,
        handlers::admin::update_subscription, handlers::admin::list_bank_details,
        handlers::admin::verify_bank_details, handlers::admin::update_car_flags
    ),
    components(
        schemas(
            models::DealerStatus, models::SubscriptionTier, models::AdminRole,
            models::DealerProfile, models::DealerSummary, models::DealerProfileResponse,
            models::DealerSummaryResponse, models::DealerOnboardedResponse,
            models::MessageResponse, models::RegisterDealerRequest, models::LoginRequest,
            models::SetupPasswordRequest, models::CreateDealerRequest,
            models::ApproveDealerRequest, models::DealerStatusChangeRequest,
            models::UpdateSubscriptionRequest, models::DealerBankDetails,
            models::DealerContact, models::BankDetailsWithDealer, models::BankDetailsRequest,
            models::BankDetailsResponse, models::BankDetailsListResponse,
            models::VerifyBankDetailsRequest, models::Car, models::CarImage,
            models::DealerBadge, models::CarListing, models::CarsResponse,
            models::DealerCarsResponse, models::CreateCarRequest, models::CarFlagsUpdate,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::AdminDashboardStats, models::DealerAnalytics,
            permissions::TierPermissions, permissions::DealerFeature,
            permissions::FeatureAccess, permissions::DealerPermissionsResponse,
        )
    ),
    tags(
        (name = "justcars", description = "JustCars.ng marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container of every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
    /// Failed-login counters; in memory, so shared by reference across clones.
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        Self {
            repo,
            storage,
            config,
            login_limiter: Arc::new(LoginRateLimiter::default()),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// dealer_auth_middleware
///
/// Rejects the request before routing unless `AuthDealer` resolves (401/404).
async fn dealer_auth_middleware(_dealer: AuthDealer, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_auth_middleware
///
/// Rejects the request before routing unless `AdminUser` resolves (401/403).
async fn admin_auth_middleware(_admin: AdminUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles routing, per-audience auth layers, observability and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = public::public_routes()
        .merge(
            dealer::dealer_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                dealer_auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_auth_middleware,
            )),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Puts the request id on the `http_request` span so every log line of a request
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
