//! Input validation for registration and login payloads. Every failure
//! carries the client-facing message, surfaced as a 400.

use regex::Regex;

use crate::api::error::ApiError;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;
const EMAIL_MAX: usize = 254;

/// Usernames nobody gets to claim.
const FORBIDDEN_USERNAMES: &[&str] = &[
    "admin",
    "administrator",
    "root",
    "system",
    "mod",
    "moderator",
    "support",
    "help",
    "api",
    "www",
    "mail",
    "ftp",
    "ssh",
    "null",
    "undefined",
    "anonymous",
    "guest",
    "test",
    "demo",
];

/// Passwords that show up in every breach corpus.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "12345678",
    "qwerty123",
    "letmein",
    "welcome123",
];

/// Validate a username, returning the normalized (trimmed) form.
pub(crate) fn validate_username(username: &str) -> Result<String, ApiError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".to_string()));
    }
    if username.len() < USERNAME_MIN {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if username.len() > USERNAME_MAX {
        return Err(ApiError::Validation(
            "Username must be less than 32 characters".to_string(),
        ));
    }
    if !Regex::new(r"^[a-zA-Z0-9._-]+$").is_ok_and(|re| re.is_match(username)) {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, underscore, hyphen, and dot".to_string(),
        ));
    }

    let lowered = username.to_lowercase();
    if FORBIDDEN_USERNAMES.contains(&lowered.as_str()) {
        return Err(ApiError::Validation("Username not allowed".to_string()));
    }

    // Reject names that look like numeric IDs or hex hashes.
    let all_digits = Regex::new(r"^[0-9]+$").is_ok_and(|re| re.is_match(username));
    let long_hex =
        username.len() > 20 && Regex::new(r"^[a-f0-9]+$").is_ok_and(|re| re.is_match(&lowered));
    if all_digits || long_hex {
        return Err(ApiError::Validation(
            "Username format not allowed".to_string(),
        ));
    }

    Ok(username.to_string())
}

/// Password strength checks: length bounds, a deny list, at least two
/// character classes, and no runs of four identical characters.
pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::Validation("Password is required".to_string()));
    }
    if password.len() < PASSWORD_MIN {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if password.len() > PASSWORD_MAX {
        return Err(ApiError::Validation(
            "Password too long (max 128 characters)".to_string(),
        ));
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(ApiError::Validation("Password is too common".to_string()));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| r#"!@#$%^&*(),.?":{}|<>"#.contains(c));
    let classes = [has_lower, has_upper, has_digit, has_special]
        .iter()
        .filter(|present| **present)
        .count();
    if classes < 2 {
        return Err(ApiError::Validation(
            "Password must contain at least 2 of: lowercase, uppercase, numbers, special characters"
                .to_string(),
        ));
    }

    if has_repeated_run(password, 4) {
        return Err(ApiError::Validation(
            "Password cannot contain 4 or more repeated characters".to_string(),
        ));
    }

    Ok(())
}

/// Email is optional. When present it gets a length bound, a shape check,
/// and a throwaway-domain filter.
pub(crate) fn validate_email(email: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
        return Ok(None);
    };

    if email.len() > EMAIL_MAX {
        return Err(ApiError::Validation("Email too long".to_string()));
    }
    if !Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .is_ok_and(|re| re.is_match(email))
    {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    let lowered = email.to_lowercase();
    let suspicious = ["tempmail", "10minutemail", "guerrillamail", "mailinator"];
    if suspicious.iter().any(|domain| lowered.contains(domain)) {
        return Err(ApiError::Validation(
            "Temporary email addresses are not allowed".to_string(),
        ));
    }

    Ok(Some(email.to_string()))
}

fn has_repeated_run(input: &str, run: usize) -> bool {
    let mut count = 0;
    let mut previous = None;
    for c in input.chars() {
        if Some(c) == previous {
            count += 1;
            if count >= run {
                return true;
            }
        } else {
            previous = Some(c);
            count = 1;
        }
    }
    false
}
