//! Input validation run by view shells before calling the gateway or API.
//!
//! The gateway assumes validated input; these checks mirror the rules the
//! registration, profile and password forms enforce.

#[cfg(test)]
#[path = "forms_test.rs"]
mod forms_test;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("email is required")]
    EmailRequired,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
}

/// Registration input ready for [`crate::AuthGateway::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Check a registration form.
///
/// # Errors
///
/// Returns the first failing rule: email, then password match, then length.
pub fn validate_registration(
    email: &str,
    password: &str,
    confirm_password: &str,
    display_name: &str,
) -> Result<Registration, FormError> {
    let email = require_email(email)?;
    let password = validate_password_change(password, confirm_password)?;
    Ok(Registration { email, password, display_name: optional(display_name) })
}

/// Check a password change form and return the new password.
///
/// # Errors
///
/// Returns [`FormError::PasswordMismatch`] or [`FormError::PasswordTooShort`].
pub fn validate_password_change(password: &str, confirm_password: &str) -> Result<String, FormError> {
    if password != confirm_password {
        return Err(FormError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::PasswordTooShort);
    }
    Ok(password.to_owned())
}

/// Check a profile form; a blank name means "no name".
///
/// # Errors
///
/// Returns [`FormError::EmailRequired`] when the email is blank.
pub fn validate_profile_update(display_name: &str, email: &str) -> Result<(Option<String>, String), FormError> {
    Ok((optional(display_name), require_email(email)?))
}

fn require_email(email: &str) -> Result<String, FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::EmailRequired);
    }
    Ok(email.to_owned())
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim()).filter(|v| !v.is_empty()).map(ToOwned::to_owned)
}
