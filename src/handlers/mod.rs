//! HTTP handlers, grouped by audience.

pub mod admin;
pub mod bank;
pub mod cars;
pub mod dealer;
pub mod uploads;

use axum::http::HeaderMap;

use crate::{
    auth::{client_ip, user_agent},
    models::AuthEvent,
    repository::RepositoryState,
};

/// Upper bound for the `limit` query parameter of the public listing endpoints.
pub const MAX_LIST_LIMIT: i64 = 50;

/// clamp_limit
///
/// Applies the endpoint default and keeps the result inside `1..=MAX_LIST_LIMIT`.
pub fn clamp_limit(requested: Option<i64>, default: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}

/// Trims a text field and treats blank input as missing.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Attaches caller IP and user agent to an audit event.
pub(crate) fn with_client(mut event: AuthEvent, headers: &HeaderMap) -> AuthEvent {
    event.ip_address = client_ip(headers);
    event.user_agent = user_agent(headers);
    event
}

/// record_event
///
/// Audit logging never fails the request; a failed insert is only traced.
pub(crate) async fn record_event(repo: &RepositoryState, event: AuthEvent) {
    let event_type = event.event_type.as_str();
    if let Err(e) = repo.record_auth_event(event).await {
        tracing::warn!(error = %e, event_type, "failed to write dealer auth log");
    }
}
