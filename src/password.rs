//! Dealer credential handling: input policy, Argon2id hashing, opaque tokens.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use regex::Regex;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Character-class complaint shown by the registration form.
pub const WEAK_PASSWORD_ON_REGISTER: &str =
    "Password must contain uppercase, lowercase, and numbers";
/// Character-class complaint shown by the password-setup page.
pub const WEAK_PASSWORD_ON_SETUP: &str =
    "Password must contain at least one uppercase letter, one lowercase letter, and one number";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// validate_email
///
/// Rejects anything that is not `local@domain.tld` shaped.
pub fn validate_email(email: &str) -> AppResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email format"))
    }
}

/// normalize_email
///
/// Emails are matched case-insensitively, so they are stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// validate_password_strength
///
/// At least eight characters with an uppercase letter, a lowercase letter and a digit.
/// A password missing a character class is refused with `weak_message`.
pub fn validate_password_strength(password: &str, weak_message: &'static str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            "Password must be at least 8 characters long",
        ));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_upper && has_lower && has_digit) {
        return Err(AppError::validation(weak_message));
    }
    Ok(())
}

/// hash_password
///
/// Argon2id with a fresh random salt; returns the PHC string stored in `password_hash`.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// A malformed stored hash is treated as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// generate_token
///
/// 256 random bits, hex encoded. Used for session cookies and password-setup links.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
