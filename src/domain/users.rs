//! Account field rules applied at signup.

use super::error::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const NAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn validate_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation(
            "username",
            "This field is required.",
        ));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(DomainError::validation(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_CHARS} characters."),
        ));
    }
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(DomainError::validation(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(username.to_string())
}

pub fn validate_name(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::validation(
            field,
            format!("Ensure this value has at most {NAME_MAX_CHARS} characters."),
        ));
    }
    Ok(value.to_string())
}

/// Empty is allowed; otherwise a single `@` with a dotted domain.
pub fn validate_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    let invalid = || DomainError::validation("email", "Enter a valid email address.");
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(email.to_string())
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), DomainError> {
    if password != confirmation {
        return Err(DomainError::validation(
            "password2",
            "The two password fields didn't match.",
        ));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::validation(
            "password2",
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
            ),
        ));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation(
            "password2",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}
