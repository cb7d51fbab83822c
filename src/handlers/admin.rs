use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    extract::{ApiJson, ApiPath, ApiQuery},
    auth::AdminUser,
    error::{AppError, AppResult},
    handlers::{record_event, required, with_client},
    lifecycle,
    models::{
        AdminDashboardStats, ApproveDealerRequest, AuthEvent, AuthEventType, BankDetailsFilter,
        BankDetailsListResponse, BankDetailsResponse, Car, CarFlagsUpdate, CreateDealerRequest,
        Dealer, DealerListFilter, DealerOnboardedResponse, DealerProfile, DealerStatus,
        DealerStatusChangeRequest, DealerSummaryResponse, NewDealer, UpdateSubscriptionRequest,
        VerifyBankDetailsRequest,
    },
    password::{generate_token, normalize_email, validate_email},
};

fn admin_event(
    event_type: AuthEventType,
    dealer: &Dealer,
    admin: &AdminUser,
    notes: Option<String>,
    headers: &HeaderMap,
) -> AuthEvent {
    let mut event = with_client(
        AuthEvent::new(event_type, Some(dealer.id), &dealer.email),
        headers,
    );
    event.admin_id = Some(admin.admin.id);
    event.admin_notes = notes;
    event
}

async fn load_dealer(state: &AppState, id: Uuid) -> AppResult<Dealer> {
    state
        .repo
        .get_dealer(id)
        .await?
        .ok_or_else(|| AppError::not_found("Dealer not found"))
}

/// get_admin_stats
///
/// [Admin Route] Moderation dashboard counters.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminDashboardStats>> {
    Ok(Json(state.repo.get_stats().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/dealers",
    params(DealerListFilter),
    responses((status = 200, description = "Dealers, newest first", body = [DealerProfile]))
)]
pub async fn list_dealers(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<DealerListFilter>,
) -> AppResult<Json<Vec<DealerProfile>>> {
    let dealers = state.repo.list_dealers(filter.status).await?;
    Ok(Json(dealers.iter().map(DealerProfile::from).collect()))
}

/// onboard_dealer
///
/// [Admin Route] Creates a `verified` dealer without a password. The returned setup link
/// must reach the dealer out of band; it expires after the configured setup TTL.
#[utoipa::path(
    post,
    path = "/api/admin/dealers",
    request_body = CreateDealerRequest,
    responses(
        (status = 201, description = "Dealer created", body = DealerOnboardedResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn onboard_dealer(
    admin: AdminUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CreateDealerRequest>,
) -> AppResult<(StatusCode, Json<DealerOnboardedResponse>)> {
    let (Some(business_name), Some(email), Some(phone), Some(location)) = (
        required(payload.business_name),
        required(payload.email),
        required(payload.phone),
        required(payload.location),
    ) else {
        return Err(AppError::validation(
            "Missing required fields: business_name, email, phone, location",
        ));
    };

    let email = normalize_email(&email);
    validate_email(&email)?;

    if let Some(existing) = state.repo.get_dealer_by_email(&email).await? {
        return Err(AppError::Conflict {
            message: "A dealer account with this email already exists".into(),
            status: Some(existing.status),
        });
    }

    let setup_token = generate_token();
    let setup_token_expires_at = Utc::now() + state.config.setup_token_ttl();
    let whatsapp = required(payload.whatsapp).or_else(|| Some(phone.clone()));

    let dealer = state
        .repo
        .create_dealer(NewDealer {
            business_name,
            email,
            phone,
            whatsapp,
            location,
            address: required(payload.address),
            business_registration_number: required(payload.business_registration_number),
            status: DealerStatus::Verified,
            subscription_tier: payload.subscription_tier.unwrap_or_default(),
            password_hash: None,
            setup_token: Some(setup_token.clone()),
            setup_token_expires_at: Some(setup_token_expires_at),
        })
        .await?;

    tracing::info!(dealer_id = %dealer.id, admin_id = %admin.admin.id, "dealer onboarded by admin");
    record_event(
        &state.repo,
        admin_event(AuthEventType::CreatedByAdmin, &dealer, &admin, None, &headers),
    )
    .await;

    let setup_link = format!(
        "{}/dealer/setup-password?token={}",
        state.config.public_base_url.trim_end_matches('/'),
        setup_token
    );

    Ok((
        StatusCode::CREATED,
        Json(DealerOnboardedResponse {
            success: true,
            dealer: (&dealer).into(),
            setup_token,
            setup_link,
            setup_token_expires_at,
        }),
    ))
}

/// approve_dealer
///
/// [Admin Route] pending -> active. The status guard is repeated in the UPDATE itself,
/// so a concurrent approval of the same dealer loses with 409.
#[utoipa::path(
    post,
    path = "/api/admin/approve-dealer",
    request_body = ApproveDealerRequest,
    responses(
        (status = 200, description = "Approved", body = DealerSummaryResponse),
        (status = 400, description = "Missing id, not pending, or no password"),
        (status = 404, description = "Dealer not found"),
        (status = 409, description = "Status changed concurrently")
    )
)]
pub async fn approve_dealer(
    admin: AdminUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ApproveDealerRequest>,
) -> AppResult<Json<DealerSummaryResponse>> {
    let dealer_id = payload
        .dealer_id
        .ok_or_else(|| AppError::validation("Dealer ID is required"))?;
    let notes = required(payload.notes);

    let dealer = load_dealer(&state, dealer_id).await?;
    lifecycle::ensure_approvable(&dealer)?;

    let dealer = state
        .repo
        .approve_dealer(dealer.id, admin.admin.id, notes.clone())
        .await?
        .ok_or_else(|| AppError::Conflict {
            message: "Dealer status changed while approving. Reload and try again.".into(),
            status: None,
        })?;

    tracing::info!(dealer_id = %dealer.id, admin_id = %admin.admin.id, "dealer approved");
    record_event(
        &state.repo,
        admin_event(AuthEventType::VerificationByAdmin, &dealer, &admin, notes, &headers),
    )
    .await;

    Ok(Json(DealerSummaryResponse {
        success: true,
        message: "Dealer approved successfully! They can now login.".into(),
        dealer: (&dealer).into(),
    }))
}

/// suspend_dealer
///
/// [Admin Route] active -> suspended. Every open session of the dealer is revoked.
#[utoipa::path(
    post,
    path = "/api/admin/dealers/{id}/suspend",
    params(("id" = Uuid, Path, description = "Dealer ID")),
    request_body = DealerStatusChangeRequest,
    responses(
        (status = 200, description = "Suspended", body = DealerSummaryResponse),
        (status = 400, description = "Dealer not active"),
        (status = 404, description = "Dealer not found"),
        (status = 409, description = "Status changed concurrently")
    )
)]
pub async fn suspend_dealer(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    payload: Option<ApiJson<DealerStatusChangeRequest>>,
) -> AppResult<Json<DealerSummaryResponse>> {
    let dealer = load_dealer(&state, id).await?;
    lifecycle::ensure_suspendable(&dealer)?;

    let dealer = state
        .repo
        .transition_dealer_status(id, DealerStatus::Active, DealerStatus::Suspended)
        .await?
        .ok_or_else(|| AppError::Conflict {
            message: "Dealer status changed concurrently".into(),
            status: None,
        })?;
    let revoked = state.repo.delete_dealer_sessions(id).await?;

    tracing::info!(dealer_id = %id, admin_id = %admin.admin.id, revoked, "dealer suspended");
    record_event(
        &state.repo,
        admin_event(
            AuthEventType::Suspended,
            &dealer,
            &admin,
            payload.and_then(|ApiJson(body)| required(body.notes)),
            &headers,
        ),
    )
    .await;

    Ok(Json(DealerSummaryResponse {
        success: true,
        message: "Dealer suspended".into(),
        dealer: (&dealer).into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/dealers/{id}/reactivate",
    params(("id" = Uuid, Path, description = "Dealer ID")),
    request_body = DealerStatusChangeRequest,
    responses(
        (status = 200, description = "Reactivated", body = DealerSummaryResponse),
        (status = 400, description = "Dealer not suspended"),
        (status = 404, description = "Dealer not found"),
        (status = 409, description = "Status changed concurrently")
    )
)]
pub async fn reactivate_dealer(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    headers: HeaderMap,
    payload: Option<ApiJson<DealerStatusChangeRequest>>,
) -> AppResult<Json<DealerSummaryResponse>> {
    let dealer = load_dealer(&state, id).await?;
    lifecycle::ensure_reactivatable(&dealer)?;

    let dealer = state
        .repo
        .transition_dealer_status(id, DealerStatus::Suspended, DealerStatus::Active)
        .await?
        .ok_or_else(|| AppError::Conflict {
            message: "Dealer status changed concurrently".into(),
            status: None,
        })?;

    tracing::info!(dealer_id = %id, admin_id = %admin.admin.id, "dealer reactivated");
    record_event(
        &state.repo,
        admin_event(
            AuthEventType::Reactivated,
            &dealer,
            &admin,
            payload.and_then(|ApiJson(body)| required(body.notes)),
            &headers,
        ),
    )
    .await;

    Ok(Json(DealerSummaryResponse {
        success: true,
        message: "Dealer reactivated".into(),
        dealer: (&dealer).into(),
    }))
}

/// update_subscription
///
/// [Admin Route] Billing action; moderators are refused.
#[utoipa::path(
    put,
    path = "/api/admin/dealers/{id}/subscription",
    params(("id" = Uuid, Path, description = "Dealer ID")),
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Tier updated", body = DealerProfile),
        (status = 403, description = "Role not allowed"),
        (status = 404, description = "Dealer not found")
    )
)]
pub async fn update_subscription(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateSubscriptionRequest>,
) -> AppResult<Json<DealerProfile>> {
    admin.require_billing_role()?;

    let dealer = state
        .repo
        .set_subscription_tier(id, payload.tier)
        .await?
        .ok_or_else(|| AppError::not_found("Dealer not found"))?;

    tracing::info!(dealer_id = %id, tier = ?payload.tier, admin_id = %admin.admin.id, "subscription tier changed");
    Ok(Json((&dealer).into()))
}

/// list_bank_details
///
/// [Admin Route] Bank accounts joined with their dealer, optionally for one dealer.
#[utoipa::path(
    get,
    path = "/api/admin/dealer-bank-details",
    params(BankDetailsFilter),
    responses(
        (status = 200, description = "Bank details", body = BankDetailsListResponse),
        (status = 403, description = "Role not allowed")
    )
)]
pub async fn list_bank_details(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<BankDetailsFilter>,
) -> AppResult<Json<BankDetailsListResponse>> {
    admin.require_billing_role()?;
    let bank_details = state.repo.list_bank_details(filter.dealer_id).await?;
    Ok(Json(BankDetailsListResponse { bank_details }))
}

#[utoipa::path(
    post,
    path = "/api/admin/dealer-bank-details",
    request_body = VerifyBankDetailsRequest,
    responses(
        (status = 200, description = "Verification updated", body = BankDetailsResponse),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Role not allowed"),
        (status = 404, description = "Bank details not found")
    )
)]
pub async fn verify_bank_details(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyBankDetailsRequest>,
) -> AppResult<Json<BankDetailsResponse>> {
    admin.require_billing_role()?;

    let (Some(id), Some(is_verified)) = (payload.id, payload.is_verified) else {
        return Err(AppError::validation("Missing required fields"));
    };

    let details = state
        .repo
        .set_bank_details_verified(id, is_verified)
        .await?
        .ok_or_else(|| AppError::not_found("Bank details not found"))?;

    tracing::info!(bank_details_id = %id, is_verified, admin_id = %admin.admin.id, "bank details verification updated");
    Ok(Json(BankDetailsResponse {
        message: Some("Bank details verification updated successfully".into()),
        bank_details: Some(details),
    }))
}

/// update_car_flags
///
/// [Admin Route] Moderation flags; omitted fields keep their value.
#[utoipa::path(
    put,
    path = "/api/admin/cars/{id}/flags",
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body = CarFlagsUpdate,
    responses(
        (status = 200, description = "Updated", body = Car),
        (status = 404, description = "Car not found")
    )
)]
pub async fn update_car_flags(
    admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(flags): ApiJson<CarFlagsUpdate>,
) -> AppResult<Json<Car>> {
    let car = state
        .repo
        .update_car_flags(id, flags)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;

    tracing::info!(car_id = %id, admin_id = %admin.admin.id, "car flags updated");
    Ok(Json(car))
}
