//! Client-side checks run before any auth request is sent

use regex::Regex;
use std::sync::OnceLock;

use crate::error::RemindrError;

/// Shortest password the backend accepts
pub const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn otp_regex() -> &'static Regex {
    static OTP: OnceLock<Regex> = OnceLock::new();
    OTP.get_or_init(|| Regex::new(r"^\d{4,8}$").expect("otp pattern is valid"))
}

/// Trimmed, lowercased email, or a validation error
pub fn normalize_email(email: &str) -> Result<String, RemindrError> {
    let email = email.trim().to_lowercase();
    if !email_regex().is_match(&email) {
        return Err(RemindrError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(email)
}

/// Password length check
pub fn validate_password(password: &str) -> Result<(), RemindrError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RemindrError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// OTP must be 4 to 8 digits
pub fn validate_otp(otp: &str) -> Result<String, RemindrError> {
    let otp = otp.trim();
    if !otp_regex().is_match(otp) {
        return Err(RemindrError::Validation(
            "One-time code must be 4 to 8 digits".to_string(),
        ));
    }
    Ok(otp.to_string())
}
