//! Dealer status transitions.
//!
//! pending --(admin approval, password present)--> active
//! verified --(setup link, no password yet)------> active
//! active <--(admin suspend / reactivate)--------> suspended
//!
//! Each guard inspects a freshly loaded `Dealer`. The write that follows repeats the
//! expected source status in its `WHERE` clause, so a concurrent change makes it a no-op.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{Dealer, DealerStatus},
};

pub fn ensure_approvable(dealer: &Dealer) -> AppResult<()> {
    if dealer.status != DealerStatus::Pending {
        return Err(AppError::validation(format!(
            "Dealer status is already '{}'. Only pending dealers can be approved.",
            dealer.status
        )));
    }
    if dealer.password_hash.is_none() {
        return Err(AppError::validation(
            "Dealer has not completed registration (no password set)",
        ));
    }
    Ok(())
}

/// ensure_password_setup_allowed
///
/// Checked in this order: status, token expiry, existing password.
pub fn ensure_password_setup_allowed(dealer: &Dealer, now: DateTime<Utc>) -> AppResult<()> {
    if dealer.status != DealerStatus::Verified {
        return Err(AppError::forbidden_with_status(
            "Account must be verified before setting up password",
            dealer.status,
        ));
    }

    match dealer.setup_token_expires_at {
        Some(expires_at) if expires_at > now => {}
        _ => {
            return Err(AppError::Gone(
                "Setup token has expired. Please contact admin for a new setup link".into(),
            ));
        }
    }

    if dealer.password_hash.is_some() {
        return Err(AppError::validation(
            "Password has already been set. Please use the login page",
        ));
    }
    Ok(())
}

pub fn ensure_can_login(dealer: &Dealer) -> AppResult<()> {
    let message = match dealer.status {
        DealerStatus::Active => return Ok(()),
        DealerStatus::Pending => "Your account is pending verification by our admin team.",
        DealerStatus::Verified => {
            "Your account has been verified. Use the setup link you received to create a password."
        }
        DealerStatus::Suspended => "Your account has been suspended. Please contact support.",
    };
    Err(AppError::forbidden_with_status(message, dealer.status))
}

pub fn ensure_suspendable(dealer: &Dealer) -> AppResult<()> {
    if dealer.status != DealerStatus::Active {
        return Err(AppError::validation(format!(
            "Dealer status is '{}'. Only active dealers can be suspended.",
            dealer.status
        )));
    }
    Ok(())
}

pub fn ensure_reactivatable(dealer: &Dealer) -> AppResult<()> {
    if dealer.status != DealerStatus::Suspended {
        return Err(AppError::validation(format!(
            "Dealer status is '{}'. Only suspended dealers can be reactivated.",
            dealer.status
        )));
    }
    Ok(())
}
