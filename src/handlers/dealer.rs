use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use chrono::Utc;

use crate::{
    AppState,
    extract::ApiJson,
    auth::{
        AuthDealer, clear_session_cookie, client_ip, session_cookie, session_token, user_agent,
    },
    error::{AppError, AppResult},
    handlers::{record_event, required, with_client},
    lifecycle,
    models::{
        AuthEvent, AuthEventType, DealerAnalytics, DealerProfileResponse, DealerStatus,
        DealerSummaryResponse, LoginRequest, MessageResponse, NewDealer, NewSession,
        RegisterDealerRequest, SetupPasswordRequest, SubscriptionTier,
    },
    password::{
        WEAK_PASSWORD_ON_REGISTER, WEAK_PASSWORD_ON_SETUP, generate_token, hash_password,
        normalize_email, validate_email, validate_password_strength, verify_password,
    },
    permissions::{DealerFeature, DealerPermissionsResponse},
    rate_limit::LOCKOUT_WINDOW_MINUTES,
};

/// register_dealer
///
/// [Public Route] Self-registration. The account starts `pending` with the chosen password
/// already hashed, and stays locked out until an admin approves it.
#[utoipa::path(
    post,
    path = "/api/dealer/register",
    request_body = RegisterDealerRequest,
    responses(
        (status = 201, description = "Registered, pending approval", body = DealerSummaryResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_dealer(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<RegisterDealerRequest>,
) -> AppResult<(StatusCode, Json<DealerSummaryResponse>)> {
    let (Some(business_name), Some(email), Some(phone), Some(location), Some(password)) = (
        required(payload.business_name),
        required(payload.email),
        required(payload.phone),
        required(payload.location),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation(
            "Missing required fields: business_name, email, phone, location, password",
        ));
    };

    let email = normalize_email(&email);
    validate_email(&email)?;
    validate_password_strength(&password, WEAK_PASSWORD_ON_REGISTER)?;

    if let Some(existing) = state.repo.get_dealer_by_email(&email).await? {
        return Err(AppError::Conflict {
            message: "A dealer account with this email already exists".into(),
            status: Some(existing.status),
        });
    }

    let password_hash = hash_password(&password)?;
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
            status: DealerStatus::Pending,
            subscription_tier: SubscriptionTier::Basic,
            password_hash: Some(password_hash),
            ..NewDealer::default()
        })
        .await?;

    tracing::info!(dealer_id = %dealer.id, "dealer registered, awaiting approval");
    record_event(
        &state.repo,
        with_client(
            AuthEvent::new(AuthEventType::Registration, Some(dealer.id), &dealer.email),
            &headers,
        ),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DealerSummaryResponse {
            success: true,
            message: "Registration successful! Your account is pending approval by our admin team. You will be notified once approved.".into(),
            dealer: (&dealer).into(),
        }),
    ))
}

/// login_dealer
///
/// [Public Route] Password login. Order of checks: lock-out, credentials, account status.
/// The attempt is charged to the email before the password is verified; correct
/// credentials release the charge. Unknown emails consume the budget like wrong passwords.
#[utoipa::path(
    post,
    path = "/api/dealer/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = DealerProfileResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account not active"),
        (status = 429, description = "Too many failed attempts")
    )
)]
pub async fn login_dealer(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<(HeaderMap, Json<DealerProfileResponse>)> {
    let (Some(email), Some(password)) = (
        required(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(remaining_attempts) = state.login_limiter.reserve_attempt(&email).await else {
        tracing::warn!(%email, "dealer login rejected: locked out");
        return Err(AppError::TooManyRequests(format!(
            "Too many failed login attempts. Please try again in {LOCKOUT_WINDOW_MINUTES} minutes."
        )));
    };

    let dealer = state.repo.get_dealer_by_email(&email).await?;
    let password_ok = dealer
        .as_ref()
        .and_then(|d| d.password_hash.as_deref())
        .is_some_and(|hash| verify_password(&password, hash));
    let dealer_id = dealer.as_ref().map(|d| d.id);

    let Some(mut dealer) = dealer.filter(|_| password_ok) else {
        tracing::warn!(%email, remaining_attempts, "dealer login failed");

        let mut event = with_client(
            AuthEvent::new(AuthEventType::LoginFailed, dealer_id, &email),
            &headers,
        );
        event.success = false;
        record_event(&state.repo, event).await;

        return Err(AppError::InvalidCredentials {
            message: "Invalid email or password".into(),
            remaining_attempts,
        });
    };

    state.login_limiter.clear(&email).await;
    lifecycle::ensure_can_login(&dealer)?;

    let ttl = state.config.session_ttl();
    let now = Utc::now();
    let session = state
        .repo
        .create_session(NewSession {
            dealer_id: dealer.id,
            session_token: generate_token(),
            ip_address: client_ip(&headers),
            user_agent: user_agent(&headers),
            expires_at: now + ttl,
        })
        .await?;
    state.repo.record_dealer_login(dealer.id).await?;
    dealer.last_login_at = Some(now);

    tracing::info!(dealer_id = %dealer.id, "dealer logged in");
    record_event(
        &state.repo,
        with_client(
            AuthEvent::new(AuthEventType::LoginSuccess, Some(dealer.id), &dealer.email),
            &headers,
        ),
    )
    .await;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        session_cookie(
            &session.session_token,
            ttl.num_seconds(),
            state.config.secure_cookies(),
        )?,
    );

    Ok((
        response_headers,
        Json(DealerProfileResponse {
            success: true,
            message: Some("Login successful".into()),
            dealer: (&dealer).into(),
        }),
    ))
}

/// logout_dealer
///
/// [Public Route] Destroys the session named by the cookie, if any, and always clears it.
#[utoipa::path(
    post,
    path = "/api/dealer/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout_dealer(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<MessageResponse>)> {
    if let Some(token) = session_token(&headers) {
        if let Some(session) = state.repo.find_active_session(token).await? {
            if let Some(dealer) = state.repo.get_dealer(session.dealer_id).await? {
                record_event(
                    &state.repo,
                    with_client(
                        AuthEvent::new(AuthEventType::Logout, Some(dealer.id), &dealer.email),
                        &headers,
                    ),
                )
                .await;
            }
        }
        state.repo.delete_session(token).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        clear_session_cookie(state.config.secure_cookies()),
    );

    Ok((
        response_headers,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".into(),
        }),
    ))
}

/// setup_password
///
/// [Public Route] Completes admin onboarding: the dealer proves possession of the setup
/// token, chooses a password, and the account becomes `active`.
#[utoipa::path(
    post,
    path = "/api/dealer/setup-password",
    request_body = SetupPasswordRequest,
    responses(
        (status = 200, description = "Password set", body = DealerSummaryResponse),
        (status = 400, description = "Invalid input or password already set"),
        (status = 403, description = "Account not verified"),
        (status = 404, description = "Unknown email/token pair"),
        (status = 410, description = "Setup token expired")
    )
)]
pub async fn setup_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<SetupPasswordRequest>,
) -> AppResult<Json<DealerSummaryResponse>> {
    let (Some(email), Some(setup_token), Some(password), Some(confirm_password)) = (
        required(payload.email),
        required(payload.setup_token),
        payload.password.filter(|p| !p.is_empty()),
        payload.confirm_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("All fields are required"));
    };

    if password != confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }
    validate_password_strength(&password, WEAK_PASSWORD_ON_SETUP)?;

    let email = normalize_email(&email);
    let dealer = state
        .repo
        .get_dealer_by_setup_token(&email, &setup_token)
        .await?
        .ok_or_else(|| AppError::not_found("Invalid setup link or token has expired"))?;

    lifecycle::ensure_password_setup_allowed(&dealer, Utc::now())?;

    let password_hash = hash_password(&password)?;
    let dealer = state
        .repo
        .complete_password_setup(dealer.id, &password_hash)
        .await?
        .ok_or_else(|| AppError::Conflict {
            message: "Password has already been set. Please use the login page".into(),
            status: None,
        })?;

    tracing::info!(dealer_id = %dealer.id, "dealer completed password setup");
    record_event(
        &state.repo,
        with_client(
            AuthEvent::new(AuthEventType::PasswordSetup, Some(dealer.id), &dealer.email),
            &headers,
        ),
    )
    .await;

    Ok(Json(DealerSummaryResponse {
        success: true,
        message: "Password setup successful! You can now login to your dealer dashboard.".into(),
        dealer: (&dealer).into(),
    }))
}

/// get_me
///
/// [Dealer Route] Session check used by the dashboard on load.
#[utoipa::path(
    get,
    path = "/api/dealer/me",
    responses(
        (status = 200, description = "Current dealer", body = DealerProfileResponse),
        (status = 401, description = "No valid session"),
        (status = 404, description = "Dealer not found or not active")
    )
)]
pub async fn get_me(AuthDealer { dealer, .. }: AuthDealer) -> Json<DealerProfileResponse> {
    Json(DealerProfileResponse {
        success: true,
        message: None,
        dealer: (&dealer).into(),
    })
}

#[utoipa::path(
    get,
    path = "/api/dealer/permissions",
    responses((status = 200, description = "Tier permissions", body = DealerPermissionsResponse))
)]
pub async fn get_permissions(
    AuthDealer { dealer, .. }: AuthDealer,
) -> Json<DealerPermissionsResponse> {
    Json(dealer.subscription_tier.into())
}

/// get_analytics
///
/// [Dealer Route] Listing statistics; part of the premium dashboard.
#[utoipa::path(
    get,
    path = "/api/dealer/analytics",
    responses(
        (status = 200, description = "Inventory analytics", body = DealerAnalytics),
        (status = 403, description = "Tier too low")
    )
)]
pub async fn get_analytics(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
) -> AppResult<Json<DealerAnalytics>> {
    if !DealerFeature::Analytics.is_unlocked_for(dealer.subscription_tier) {
        return Err(AppError::forbidden(
            "Analytics requires a Premium or Luxury subscription",
        ));
    }
    let cars = state.repo.list_dealer_cars(dealer.id).await?;
    Ok(Json(DealerAnalytics::from_cars(&cars)))
}
