use crate::error::SyncError;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9@._%+-]{6,254}$").expect("valid regex"));

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]{1,64}@(?:[a-zA-Z0-9-]{1,63}\.){1,8}[a-zA-Z]{2,63}$")
        .expect("valid regex")
});

const SPECIAL_CHARS: &str = " `!@#$%^&*()_+-=]{};':\"\\|,.<>?~";

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_CHARS.is_match(email) && EMAIL_SHAPE.is_match(email)
}

pub fn is_length_ok(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

pub fn has_uppercase(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_uppercase())
}

pub fn has_lowercase(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
}

pub fn has_digit(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_digit())
}

pub fn has_special_char(password: &str) -> bool {
    password.chars().any(|c| SPECIAL_CHARS.contains(c))
}

/// Checks an email/password pair before it is sent to `auth/login`.
/// The error lists every rule that failed.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), SyncError> {
    let checks: [(bool, &str); 6] = [
        (is_valid_email(email), "invalid email"),
        (
            is_length_ok(password),
            "password must be at least 8 characters",
        ),
        (has_uppercase(password), "password needs an uppercase letter"),
        (has_lowercase(password), "password needs a lowercase letter"),
        (has_digit(password), "password needs a digit"),
        (has_special_char(password), "password needs a special character"),
    ];

    let failed: Vec<&str> = checks
        .iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, reason)| *reason)
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(SyncError::InvalidCredentials(failed.join(", ")))
    }
}
