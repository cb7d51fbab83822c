use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{Admin, Dealer, DealerStatus},
    repository::RepositoryState,
};

/// Name of the cookie carrying the opaque dealer session token.
pub const SESSION_COOKIE: &str = "dealer_session";

/// Claims
///
/// Payload of the admin access tokens issued by the hosted auth service (HS256).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the auth-service user id, matched against `admins.auth_id`.
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// AdminUser Extractor Result
///
/// An authenticated back-office user with an active row in `admins`.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub admin: Admin,
}

impl AdminUser {
    /// Tier changes and bank verification are restricted to `admin` and `super_admin`.
    pub fn require_billing_role(&self) -> Result<(), AppError> {
        if self.admin.role.can_manage_billing() {
            Ok(())
        } else {
            Err(AppError::forbidden("Insufficient admin role for this action"))
        }
    }
}

/// AdminUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, an `x-admin-id` header holding an admin auth id.
/// 2. Bearer token: decoded with the shared secret, expiry enforced.
/// 3. DB lookup: the subject must map to an active admin.
///
/// Rejection: 401 for a missing or invalid token, 403 when the user is not an active admin.
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(auth_id) = header_uuid(&parts.headers, "x-admin-id") {
                if let Some(admin) = repo.get_active_admin(auth_id).await? {
                    return Ok(AdminUser { admin });
                }
            }
        }

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // The hosted auth service sets `aud`; the secret alone authenticates the issuer.
        validation.validate_aud = false;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("admin token expired"),
                other => tracing::debug!(error = ?other, "admin token rejected"),
            }
            AppError::unauthorized("Not authenticated")
        })?;

        let admin = repo
            .get_active_admin(token_data.claims.sub)
            .await?
            .ok_or_else(|| AppError::forbidden("Admin access required"))?;

        Ok(AdminUser { admin })
    }
}

/// AuthDealer Extractor Result
///
/// A dealer with a live session. `session_id` is nil when the local bypass was used.
#[derive(Debug, Clone)]
pub struct AuthDealer {
    pub dealer: Dealer,
    pub session_id: Uuid,
}

/// AuthDealer Extractor Implementation
///
/// Resolves the `dealer_session` cookie to an unexpired session, then to an active
/// dealer, and refreshes the session's `last_active_at`.
///
/// Rejection: 401 without a valid session, 404 when the dealer is missing or not active.
impl<S> FromRequestParts<S> for AuthDealer
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(dealer_id) = header_uuid(&parts.headers, "x-dealer-id") {
                if let Some(dealer) = repo.get_dealer(dealer_id).await? {
                    if dealer.status == DealerStatus::Active {
                        return Ok(AuthDealer {
                            dealer,
                            session_id: Uuid::nil(),
                        });
                    }
                }
            }
        }

        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

        let session = repo
            .find_active_session(token)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;

        let dealer = repo
            .get_dealer(session.dealer_id)
            .await?
            .filter(|dealer| dealer.status == DealerStatus::Active)
            .ok_or_else(|| AppError::not_found("Dealer account not found or not active"))?;

        repo.touch_session(session.id).await?;

        Ok(AuthDealer {
            dealer,
            session_id: session.id,
        })
    }
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Option<Uuid> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// session_token
///
/// Reads the dealer session token out of the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
}

/// session_cookie
///
/// `Set-Cookie` value for a fresh session. `Secure` is added outside local development.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| AppError::internal(e.to_string()))
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("dealer_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("dealer_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

/// client_ip
///
/// Best-effort caller address: first `x-forwarded-for` hop, then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
