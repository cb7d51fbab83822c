use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Enumerations (Mapped to Postgres ENUM types) ---

/// DealerStatus
///
/// Lifecycle state of a dealer account, stored as the `dealer_status` Postgres enum.
/// Self-registered dealers start `pending`; admin-onboarded dealers start `verified`
/// and become `active` once they set their own password.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "dealer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DealerStatus {
    #[default]
    Pending,
    Verified,
    Active,
    Suspended,
}

impl DealerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealerStatus::Pending => "pending",
            DealerStatus::Verified => "verified",
            DealerStatus::Active => "active",
            DealerStatus::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for DealerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SubscriptionTier
///
/// Paid dealer plan. Only gates feature visibility (see `permissions`).
/// Older clients send the free tier as `verified`, which is accepted as `basic`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "subscription_tier", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SubscriptionTier {
    #[default]
    #[serde(alias = "verified")]
    Basic,
    Premium,
    Luxury,
}

/// AdminRole
///
/// Role of a back-office user. Moderators may approve dealers and moderate cars,
/// but billing-related actions (tiers, bank verification) need `admin` or above.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AdminRole {
    SuperAdmin,
    #[default]
    Admin,
    Moderator,
}

impl AdminRole {
    pub fn can_manage_billing(&self) -> bool {
        matches!(self, AdminRole::SuperAdmin | AdminRole::Admin)
    }
}

// --- Core Records (Mapped to Database) ---

/// Dealer
///
/// Full row of the `dealers` table. Carries secrets (password hash, setup token), so it is
/// never serialized to clients directly; handlers answer with `DealerProfile` instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Dealer {
    pub id: Uuid,
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: Option<String>,
    pub location: String,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub status: DealerStatus,
    pub subscription_tier: SubscriptionTier,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by_admin_id: Option<Uuid>,
    pub verification_notes: Option<String>,
    pub password_hash: Option<String>,
    pub password_set_at: Option<DateTime<Utc>>,
    pub setup_token: Option<String>,
    pub setup_token_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewDealer
///
/// Insert payload for the `dealers` table, shared by self-registration (pending + password)
/// and admin onboarding (verified + setup token).
#[derive(Debug, Clone, Default)]
pub struct NewDealer {
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: Option<String>,
    pub location: String,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub status: DealerStatus,
    pub subscription_tier: SubscriptionTier,
    pub password_hash: Option<String>,
    pub setup_token: Option<String>,
    pub setup_token_expires_at: Option<DateTime<Utc>>,
}

/// DealerSession
///
/// Row of `dealer_sessions`. The opaque `session_token` is what travels in the cookie.
#[derive(Debug, Clone, FromRow, Default)]
pub struct DealerSession {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub session_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DealerSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub dealer_id: Uuid,
    pub session_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Admin
///
/// Back-office user, linked to the hosted auth service's user id through `auth_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Admin {
    pub id: Uuid,
    pub auth_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: AdminRole,
    pub is_active: bool,
}

/// AuthEventType
///
/// Kinds of rows written to `dealer_auth_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventType {
    Registration,
    LoginSuccess,
    LoginFailed,
    Logout,
    PasswordSetup,
    VerificationByAdmin,
    CreatedByAdmin,
    Suspended,
    Reactivated,
}

impl AuthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventType::Registration => "registration",
            AuthEventType::LoginSuccess => "login_success",
            AuthEventType::LoginFailed => "login_failed",
            AuthEventType::Logout => "logout",
            AuthEventType::PasswordSetup => "password_setup",
            AuthEventType::VerificationByAdmin => "verification_by_admin",
            AuthEventType::CreatedByAdmin => "created_by_admin",
            AuthEventType::Suspended => "suspended_by_admin",
            AuthEventType::Reactivated => "reactivated_by_admin",
        }
    }
}

/// AuthEvent
///
/// One audit record. Writing it is best-effort: a failed insert is logged, never surfaced.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub dealer_id: Option<Uuid>,
    pub dealer_email: String,
    pub event_type: AuthEventType,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub admin_id: Option<Uuid>,
    pub admin_notes: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, dealer_id: Option<Uuid>, dealer_email: &str) -> Self {
        Self {
            dealer_id,
            dealer_email: dealer_email.to_string(),
            event_type,
            success: true,
            ip_address: None,
            user_agent: None,
            admin_id: None,
            admin_notes: None,
        }
    }
}

/// DealerBankDetails
///
/// Payout account of a dealer (`dealer_bank_details`, one row per dealer).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct DealerBankDetails {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub account_name: String,
    pub account_number: String,
    pub bank_name: String,
    pub bank_code: Option<String>,
    pub account_type: String,
    pub is_verified: bool,
    #[ts(type = "string | null")]
    pub verified_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// DealerContact
///
/// Dealer columns joined onto bank details for the admin review screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerContact {
    pub id: Uuid,
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub is_verified: bool,
    pub subscription_tier: SubscriptionTier,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BankDetailsWithDealer {
    #[serde(flatten)]
    pub bank_details: DealerBankDetails,
    pub dealer: DealerContact,
}

/// Car
///
/// A listing row from `cars`. Prices are whole Naira.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Car {
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    pub description: Option<String>,
    pub status: String,
    /// Collection the car was posted into (`premium` or `luxury`), if any.
    pub collection: Option<SubscriptionTier>,
    pub is_verified: bool,
    pub is_featured: bool,
    pub is_premium_verified: bool,
    pub is_just_arrived: bool,
    #[ts(type = "string | null")]
    pub just_arrived_date: Option<DateTime<Utc>>,
    pub is_blocked: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct CarImage {
    pub image_url: String,
    pub is_primary: bool,
}

/// DealerBadge
///
/// Minimal dealer card shown next to a public listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerBadge {
    pub id: Uuid,
    pub business_name: String,
    pub phone: String,
    pub subscription_tier: SubscriptionTier,
}

/// CarListing
///
/// Public listing: the car, its dealer badge and its images (primary image first).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CarListing {
    #[serde(flatten)]
    pub car: Car,
    pub dealer: DealerBadge,
    pub images: Vec<CarImage>,
}

// --- Request Payloads (Input Schemas) ---

// Required text fields are `Option` so a missing field yields our own 400 message
// instead of the extractor's generic rejection.

/// RegisterDealerRequest
///
/// Body of `POST /api/dealer/register`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterDealerRequest {
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// SetupPasswordRequest
///
/// Body of `POST /api/dealer/setup-password`; field names follow the setup page's camelCase.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SetupPasswordRequest {
    pub email: Option<String>,
    pub setup_token: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// CreateDealerRequest
///
/// Admin onboarding of a dealer who will set their own password through a setup link.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateDealerRequest {
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub business_registration_number: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApproveDealerRequest {
    pub dealer_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerStatusChangeRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateSubscriptionRequest {
    pub tier: SubscriptionTier,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
pub struct DealerListFilter {
    pub status: Option<DealerStatus>,
}

/// BankDetailsRequest
///
/// Body of `POST /api/dealer/bank-details`. `account_number` must be a 10-digit NUBAN.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BankDetailsRequest {
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub bank_code: Option<String>,
    pub account_type: Option<String>,
}

/// BankDetailsInput
///
/// Validated form of `BankDetailsRequest` handed to the repository.
#[derive(Debug, Clone, Default)]
pub struct BankDetailsInput {
    pub account_name: String,
    pub account_number: String,
    pub bank_name: String,
    pub bank_code: Option<String>,
    pub account_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VerifyBankDetailsRequest {
    pub id: Option<Uuid>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
pub struct BankDetailsFilter {
    pub dealer_id: Option<Uuid>,
}

/// CreateCarRequest
///
/// Body of `POST /api/dealer/cars`. Image URLs come from the presigned upload flow;
/// the first one becomes the primary image.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCarRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<i64>,
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub collection: Option<SubscriptionTier>,
}

/// NewCar
///
/// Validated insert payload for `cars` (+ `car_images`).
#[derive(Debug, Clone, Default)]
pub struct NewCar {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub collection: Option<SubscriptionTier>,
}

/// CarFlagsUpdate
///
/// Partial moderation update; only provided flags change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CarFlagsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_just_arrived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,
}

/// CarListQuery
///
/// `?limit=` of the public feeds. A value that is not an integer counts as absent,
/// so the feed falls back to its default size.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
pub struct CarListQuery {
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<i64>,
}

fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for car media.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    #[schema(example = "front.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// Object key to reference in the car listing.
    pub resource_key: String,
}

// --- Response Schemas (Output) ---

/// DealerProfile
///
/// Client-facing view of a dealer, without credentials.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerProfile {
    pub id: Uuid,
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: Option<String>,
    pub location: String,
    pub address: Option<String>,
    pub status: DealerStatus,
    pub subscription_tier: SubscriptionTier,
    pub is_verified: bool,
    #[ts(type = "string | null")]
    pub verified_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<&Dealer> for DealerProfile {
    fn from(dealer: &Dealer) -> Self {
        Self {
            id: dealer.id,
            business_name: dealer.business_name.clone(),
            email: dealer.email.clone(),
            phone: dealer.phone.clone(),
            whatsapp: dealer.whatsapp.clone(),
            location: dealer.location.clone(),
            address: dealer.address.clone(),
            status: dealer.status,
            subscription_tier: dealer.subscription_tier,
            is_verified: dealer.is_verified,
            verified_at: dealer.verified_at,
            last_login_at: dealer.last_login_at,
            created_at: dealer.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerSummary {
    pub id: Uuid,
    pub business_name: String,
    pub email: String,
    pub status: DealerStatus,
}

impl From<&Dealer> for DealerSummary {
    fn from(dealer: &Dealer) -> Self {
        Self {
            id: dealer.id,
            business_name: dealer.business_name.clone(),
            email: dealer.email.clone(),
            status: dealer.status,
        }
    }
}

/// DealerProfileResponse
///
/// Envelope used by endpoints that answer with the full dealer profile (login, me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerProfileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub dealer: DealerProfile,
}

/// DealerSummaryResponse
///
/// Envelope for lifecycle actions (register, setup-password, approve, suspend).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerSummaryResponse {
    pub success: bool,
    pub message: String,
    pub dealer: DealerSummary,
}

/// DealerOnboardedResponse
///
/// Answer to admin onboarding: the setup link must reach the dealer out of band.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DealerOnboardedResponse {
    pub success: bool,
    pub dealer: DealerSummary,
    pub setup_token: String,
    pub setup_link: String,
    #[ts(type = "string")]
    pub setup_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BankDetailsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub bank_details: Option<DealerBankDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BankDetailsListResponse {
    pub bank_details: Vec<BankDetailsWithDealer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CarsResponse {
    pub cars: Vec<CarListing>,
}

/// AdminDashboardStats
///
/// Output schema for the moderation dashboard (GET /api/admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_dealers: i64,
    pub pending_dealers: i64,
    pub verified_dealers: i64,
    pub active_dealers: i64,
    pub suspended_dealers: i64,
    pub total_cars: i64,
    pub blocked_cars: i64,
    /// Bank accounts waiting for an admin to verify them.
    pub pending_bank_verifications: i64,
}

/// DealerAnalytics
///
/// Inventory breakdown for the premium analytics screen, derived from the dealer's cars.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DealerAnalytics {
    pub total_listings: i64,
    pub active_listings: i64,
    pub verified_listings: i64,
    pub featured_listings: i64,
    pub just_arrived_listings: i64,
    pub blocked_listings: i64,
    pub premium_collection_listings: i64,
    pub luxury_collection_listings: i64,
    /// Sum of asking prices of active, unblocked listings, capped at `i64::MAX`.
    pub active_inventory_value: i64,
}

impl DealerAnalytics {
    pub fn from_cars(cars: &[Car]) -> Self {
        let count = |pred: &dyn Fn(&Car) -> bool| cars.iter().filter(|car| pred(car)).count() as i64;
        let is_live = |car: &Car| car.status == "active" && !car.is_blocked;

        Self {
            total_listings: cars.len() as i64,
            active_listings: count(&is_live),
            verified_listings: count(&|car| car.is_verified),
            featured_listings: count(&|car| car.is_featured),
            just_arrived_listings: count(&|car| car.is_just_arrived),
            blocked_listings: count(&|car| car.is_blocked),
            premium_collection_listings: count(&|car| {
                car.collection == Some(SubscriptionTier::Premium)
            }),
            luxury_collection_listings: count(&|car| {
                car.collection == Some(SubscriptionTier::Luxury)
            }),
            active_inventory_value: cars
                .iter()
                .filter(|car| is_live(car))
                .fold(0i64, |total, car| total.saturating_add(car.price)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerCarsResponse {
    pub cars: Vec<Car>,
}
